//! tsla-watcher - Tesla inventory watcher with email and SMS alerts
//!
//! Polls the Tesla inventory API for matching vehicles, resolves true
//! out-the-door pricing per listing, and notifies a mailing list when the
//! results change.

pub mod config;
pub mod error;
pub mod format;
pub mod incentives;
pub mod inventory;
pub mod notify;
pub mod server;
pub mod snapshot;
pub mod watcher;

pub use config::Config;
pub use error::WatchError;
pub use incentives::{IncentiveEngine, Jurisdiction};
pub use inventory::{InventoryClient, ListingSummary};
pub use watcher::Watcher;
