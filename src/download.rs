//! Simulated shop download.
//!
//! Stands in for a slow remote fetch: shops become available one at a time,
//! each after a fixed delay following the previous one. The delay is a tokio
//! timer, so awaiting it parks the lane's runtime rather than blocking it.

use std::ops::RangeInclusive;
use std::time::Duration;

use crate::shop::{Shop, shop_name};

/// Ids synthesized by a "replace all" download.
pub const FRESH_BATCH: RangeInclusive<u32> = 1..=3;

/// Ids synthesized by an "append" download.
pub const ADDITIONAL_BATCH: RangeInclusive<u32> = 4..=6;

/// Download one shop per id, in order, waiting `delay` after each.
pub async fn download_batch(ids: RangeInclusive<u32>, delay: Duration) -> Vec<Shop> {
    let mut shops = Vec::with_capacity(ids.clone().count());
    for id in ids {
        let shop = Shop::new(shop_name(id));
        tracing::info!(name = %shop.name, "downloaded shop");
        shops.push(shop);
        tokio::time::sleep(delay).await;
    }
    shops
}
