#![doc = include_str!("../README.md")]

mod builder;
mod cache;
mod entry;
mod error;
mod list;
mod metrics;
mod segment;
mod traits;

pub use builder::CacheBuilder;
pub use cache::{Cache, PutOptions};
pub use entry::EntryRef;
pub use error::ConfigError;
pub use metrics::CacheMetrics;
pub use traits::CacheValue;
