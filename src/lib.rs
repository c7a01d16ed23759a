//! A shop session: downloads coffee shop records on a serial background
//! lane, persists them to a record store, and publishes their count to a
//! UI-affine lane.

mod download;
pub use download::{ADDITIONAL_BATCH, FRESH_BATCH, download_batch};
mod error;
mod lane;
mod session;
mod shop;
mod state;
mod storage;
mod ui;

pub use error::SessionError;
pub use lane::{Completion, Outcome};
pub use session::{SessionConfig, ShopSession, ShopSessionBuilder};
pub use shop::{Shop, shop_name};
pub use state::PublishedState;
pub use storage::{FileStore, MemoryStore, RecordStore};
pub use ui::{CountLabel, LogLabel, RecordingLabel, UiHandle, spawn_ui_lane};
