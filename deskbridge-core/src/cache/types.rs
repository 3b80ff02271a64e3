//! Core type definitions for the cache system

use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Cache key type: `<namespace>:<operation>:<canonical params>`
pub type CacheKey = String;

/// Cache value type: the decoded remote response
pub type CacheValue = Payload;

/// Statistics for cache diagnostics
///
/// Counters only grow until [`ResponseCache::clear`](crate::cache::ResponseCache::clear).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the store
    pub hits: u64,

    /// Lookups that had to call the loader (bypassed calls included)
    pub misses: u64,

    /// Values written to the store
    pub sets: u64,

    /// Entries removed by key or pattern invalidation
    pub invalidations: u64,

    /// Lookups that skipped the store entirely
    pub bypasses: u64,

    /// Entries evicted because the store was full
    pub evictions: u64,

    /// Number of entries currently held (expired ones included until swept)
    pub entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, sets: {}, invalidations: {}, bypasses: {}, entries: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.sets,
            self.invalidations,
            self.bypasses,
            self.entries
        )
    }
}

/// Staleness tolerance assigned to each read operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlTier {
    /// 5 minutes: content that is edited often
    Short,
    /// 15 minutes: searches and listings
    Medium,
    /// 1 hour: metadata that rarely changes
    Long,
}

impl TtlTier {
    pub const fn duration(&self) -> Duration {
        match self {
            TtlTier::Short => Duration::from_secs(5 * 60),
            TtlTier::Medium => Duration::from_secs(15 * 60),
            TtlTier::Long => Duration::from_secs(60 * 60),
        }
    }
}

impl fmt::Display for TtlTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtlTier::Short => write!(f, "short"),
            TtlTier::Medium => write!(f, "medium"),
            TtlTier::Long => write!(f, "long"),
        }
    }
}
