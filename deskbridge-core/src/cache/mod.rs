//! # Response Caching Layer
//!
//! A read-through cache placed in front of every remote read, with explicit
//! invalidation driven by mutations.
//!
//! ## Features
//!
//! - **TTL-Based Expiration**: entries are valid only while `now < stored_at + ttl`
//! - **Deterministic Keys**: parameter bags are canonicalized, so member order never matters
//! - **Pattern Invalidation**: purge a family of keys with one regular expression
//! - **LRU Eviction**: bounded entry count
//! - **Operator Override**: disable and re-enable the whole cache at runtime
//!
//! ## Example
//!
//! ```rust
//! use deskbridge_core::cache::{CacheConfig, ResponseCache};
//! use deskbridge_core::payload::{Params, Payload};
//! use std::time::Duration;
//!
//! # async fn example() -> deskbridge_core::Result<()> {
//! let cache = ResponseCache::new(CacheConfig::builder().namespace("docs").build())?;
//!
//! let key = cache.keys().build("list_gmail_labels", &Params::new());
//! let labels = cache
//!     .get_or_fetch(&key, Duration::from_secs(3600), false, || async {
//!         Ok(Payload::Raw("INBOX, SENT".to_string()))
//!     })
//!     .await?;
//! println!("{}", labels.render());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod invalidation;
pub mod key;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::CacheEntry;
pub use invalidation::{InvalidationRule, InvalidationTarget, Invalidator, ResolvedTarget};
pub use key::CacheKeyBuilder;
pub use store::{spawn_cleanup_task, ResponseCache};
pub use types::{CacheKey, CacheStats, CacheValue, TtlTier};
