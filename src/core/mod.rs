//! Core abstractions shared by the data-access layer and the CLI

pub mod analytics;
pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod format;
pub mod log;
pub mod query;
pub mod routes;
pub mod timeframe;

// Re-export main types for cleaner imports
pub use cache::Cache;
pub use currency::Currency;
pub use error::{Error, Result};
pub use query::{QueryKey, QueryState};
pub use timeframe::{DateRange, Timeframe};
