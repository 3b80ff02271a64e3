//! # Deskbridge Core (deskbridge-core)
//!
//! Read-through caching and a single persistent session in front of a remote
//! productivity-suite facade (mail, calendar, files, documents, spreadsheets,
//! tasks and comments).
//!
//! ## Features
//!
//! - Read-through response cache with TTL tiers (5 min, 15 min, 1 h)
//! - Deterministic cache keys independent of parameter order
//! - Write-invalidation: every mutation purges the reads it makes stale
//! - One lazily connected session shared by every command
//! - Identity injection on every outgoing request
//! - Async-first design using tokio
//!
//! ## Cached Calls
//!
//! ```no_run
//! use deskbridge_core::{CachedClient, ResponseCache, SessionConfig, SessionManager};
//! use deskbridge_core::payload::Params;
//! use std::sync::Arc;
//! # use deskbridge_core::transport::Connector;
//!
//! # async fn example(connector: Arc<dyn Connector>) -> deskbridge_core::Result<()> {
//! let session = Arc::new(SessionManager::new(SessionConfig::from_env()?, connector));
//! let cache = Arc::new(ResponseCache::with_namespace("deskbridge")?);
//! let client = CachedClient::new(cache, session.clone());
//!
//! let mut query = Params::new();
//! query.insert("query".into(), "invoice".into());
//!
//! // Served remotely, then from the cache for the next 5 minutes
//! let hits = client.call("search_gmail_messages", query.clone()).await?;
//! let again = client.call("search_gmail_messages", query).await?;
//! assert_eq!(hits, again);
//!
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Write Invalidation
//!
//! Mutations always reach the remote side. Once they succeed, the cached reads
//! listed for them in the [`catalog`] are dropped before the call returns:
//!
//! ```no_run
//! # use deskbridge_core::{CachedClient, payload::Params};
//! # async fn example(client: &CachedClient, message: Params) -> deskbridge_core::Result<()> {
//! client.call("send_gmail_message", message).await?;
//! // Every cached message search is gone
//! println!("{}", client.cache_stats().await);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod client;
pub mod error;
pub mod payload;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheEntry, CacheKey, CacheKeyBuilder, CacheStats, CacheValue,
    InvalidationRule, InvalidationTarget, Invalidator, ResponseCache, TtlTier,
};
pub use catalog::{Area, OperationKind, OperationSpec};
pub use client::CachedClient;
pub use error::{BridgeError, Result};
pub use payload::{ContentBlock, Envelope, Params, Payload};
pub use session::{
    Credentials, IdentityDecorator, RequestDecorator, SessionConfig, SessionManager, SessionStatus,
};
pub use transport::{Connector, RemoteFacade, Transport};
