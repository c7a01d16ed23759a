//! Walks a shop session through its three user actions against an on-disk
//! record store, logging every step.
//!
//! Run with: `cargo run --example shop-demo -- [STORE_DIR]`
//!
//! `STORE_DIR` defaults to `<temp>/shop-session`. Set `RUST_LOG=debug` to
//! also see the lanes start and stop.

use std::path::PathBuf;
use std::time::Duration;

use shop_session::{Outcome, ShopSession};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("shop-session"));

    let session = ShopSession::builder()
        .fetch_delay(Duration::from_millis(300))
        .open_in(&dir)?;

    session.initialize()?.await?;
    println!("existing shops: {}", session.shops().len());

    session.replace_all_with_fresh_batch()?.await?;

    if let Outcome::Published { count } = session.append_additional_batch()?.await? {
        println!("after append: {count}");
    }

    session.sync_ui().await?;
    for shop in session.shops().iter() {
        println!("  {}", shop.name);
    }
    if let Some(path) = session.store_location() {
        println!("store: {}", path.display());
    }

    session.shutdown();
    Ok(())
}
