//! Cache entry management with TTL support

use crate::cache::types::CacheValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value together with the moment it was stored and its lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached value
    pub value: CacheValue,

    /// When the value was stored
    pub stored_at: DateTime<Utc>,

    /// How long the value stays valid
    pub ttl: Duration,
}

impl CacheEntry {
    /// Create an entry stored now
    pub fn new(value: CacheValue, ttl: Duration) -> Self {
        Self::stored_at(value, ttl, Utc::now())
    }

    /// Create an entry with an explicit storage time
    pub fn stored_at(value: CacheValue, ttl: Duration, stored_at: DateTime<Utc>) -> Self {
        Self {
            value,
            stored_at,
            ttl,
        }
    }

    /// When the entry stops being valid
    ///
    /// A TTL too large for chrono saturates to the maximum representable time.
    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.stored_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Valid iff `now < stored_at + ttl`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(Utc::now())
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now();
        if !self.is_valid_at(now) {
            return None;
        }
        (self.expires_at() - now).to_std().ok()
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.stored_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use std::thread::sleep;

    fn raw(text: &str) -> CacheValue {
        Payload::Raw(text.to_string())
    }

    #[test]
    fn test_cache_entry_creation() {
        let entry = CacheEntry::new(raw("value"), Duration::from_secs(3600));

        assert_eq!(entry.value, raw("value"));
        assert!(!entry.is_expired());
        assert!(entry.expires_at() > entry.stored_at);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(raw("value"), Duration::from_millis(100));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(150));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_validity_boundary_is_exclusive() {
        let stored = Utc::now();
        let entry = CacheEntry::stored_at(raw("v"), Duration::from_secs(10), stored);

        assert!(entry.is_valid_at(stored + chrono::Duration::seconds(9)));
        assert!(!entry.is_valid_at(stored + chrono::Duration::seconds(10)));
    }

    #[test]
    fn test_zero_ttl_is_never_valid() {
        let entry = CacheEntry::new(raw("v"), Duration::ZERO);
        assert!(entry.is_expired());
        assert!(entry.time_until_expiration().is_none());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new(raw("v"), Duration::from_secs(u64::MAX));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_time_until_expiration() {
        let entry = CacheEntry::new(raw("value"), Duration::from_secs(3600));

        let time_left = entry.time_until_expiration();
        assert!(time_left.is_some());
        assert!(time_left.unwrap() <= Duration::from_secs(3600));
    }

    #[test]
    fn test_age() {
        let entry = CacheEntry::new(raw("value"), Duration::from_secs(3600));

        sleep(Duration::from_millis(10));
        assert!(entry.age() >= Duration::from_millis(10));
    }
}
