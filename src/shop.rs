//! The persisted `Shop` record.

use serde::{Deserialize, Serialize};

/// A coffee shop record, the only entity kept in the record store.
///
/// Shops carry no identity of their own: duplicates are allowed and the
/// store decides ordering (insertion order for the built-in backends).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    /// Display name. Missing in stored data reads back as `""`.
    #[serde(default)]
    pub name: String,
}

impl Shop {
    /// Create a shop with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Name given to the `index`-th downloaded shop, e.g. `"Coffee Shop 4"`.
pub fn shop_name(index: u32) -> String {
    format!("Coffee Shop {index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_is_empty() {
        assert_eq!(Shop::default().name, "");
    }

    #[test]
    fn shop_name_format() {
        assert_eq!(shop_name(1), "Coffee Shop 1");
        assert_eq!(shop_name(6), "Coffee Shop 6");
    }

    #[test]
    fn missing_name_deserializes_to_empty() {
        let shop: Shop = serde_json::from_str("{}").expect("empty object should deserialize");
        assert_eq!(shop, Shop::default());
    }
}
