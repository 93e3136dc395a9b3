//! request-cache - An in-memory request cache for Rust
//!
//! This library memoizes expensive fetches (disk reads, provider calls) behind
//! a key, with:
//! - Time-to-live expiry
//! - Stale-while-revalidate (SWR) semantics
//! - Deduplication of concurrent fetches for the same key
//! - Bounded size with oldest-inserted-first eviction
//! - Periodic background sweeping of dead entries
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use request_cache::{GetOrSetOptions, RequestCache, build_cache_key};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache: RequestCache<String, String> = RequestCache::builder()
//!         .name("features")
//!         .default_ttl(Duration::from_secs(30))
//!         .swr(Duration::from_secs(60))
//!         .max_entries(1_000)
//!         .cleanup_interval(Duration::from_secs(300))
//!         .build()?;
//!
//!     let key = build_cache_key(["features", "/projects/demo"]);
//!     let features = cache
//!         .get_or_set(key, || async { Ok("loaded from disk".to_string()) }, GetOrSetOptions::default())
//!         .await?;
//!
//!     cache.dispose();
//!     Ok(())
//! }
//! ```

mod builder;
mod cache;
mod config;
mod entry;
mod error;
mod inflight;
mod metrics;
mod store;
mod sweeper;
mod swr;
mod utils;

// Re-export public API
pub use builder::RequestCacheBuilder;
pub use cache::{BoxError, RequestCache};
pub use config::CacheConfig;
pub use entry::Freshness;
pub use error::{CacheError, FetchError};
pub use metrics::{CacheMetric, CacheStats, MetricsSink, ReadStatus};
pub use swr::GetOrSetOptions;
pub use utils::build_cache_key;
