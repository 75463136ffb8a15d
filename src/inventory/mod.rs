//! Inventory-specific modules for HTTP client, pricing, extraction, and data models.

pub mod client;
pub mod extract;
pub mod models;
pub mod pricing;
pub mod scrape;

pub use client::{InventoryApi, InventoryClient, OrderPage};
pub use extract::Extractor;
pub use models::{ListingSummary, OptionCode, RawListing, SearchPage};
pub use pricing::{PricingQuote, PricingResolver};
