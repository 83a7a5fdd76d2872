pub mod config;
pub mod error;
pub mod fetcher;
pub mod notifier;
pub mod page_cache;
pub mod prices;
pub mod providers;
pub mod watcher;

pub use error::{FailureKind, FetchError};
