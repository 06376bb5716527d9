//! Cache entry management with profile-driven freshness

use crate::binding::CacheBinding;
use crate::profile::CacheProfile;
use crate::tag::Tag;
use crate::types::{CacheKey, CacheValue, Freshness};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `at + duration`, saturating at the end of time
pub(crate) fn deadline(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A cached value with its binding and freshness deadlines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cache key
    pub key: CacheKey,

    /// The cached value
    pub value: CacheValue,

    /// Entry metadata
    pub metadata: CacheMetadata,
}

impl CacheEntry {
    /// Create an entry computed just now under `binding` and its resolved `profile`
    pub fn new(key: CacheKey, value: CacheValue, binding: &CacheBinding, profile: CacheProfile) -> Self {
        let now = Utc::now();

        Self {
            key,
            value,
            metadata: CacheMetadata {
                created_at: now,
                accessed_at: now,
                revalidate_at: deadline(now, profile.revalidate),
                expires_at: deadline(now, profile.expire),
                access_count: 0,
                profile: binding.profile.clone(),
                tags: binding.tags.clone(),
                marked_stale: false,
            },
        }
    }

    /// Classify the entry at `now`
    pub fn freshness_at(&self, now: DateTime<Utc>) -> Freshness {
        if now >= self.metadata.expires_at {
            Freshness::Expired
        } else if self.metadata.marked_stale || now >= self.metadata.revalidate_at {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness_at(Utc::now())
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.freshness() == Freshness::Expired
    }

    /// Mark stale; optionally re-bind expiry to `now + expire`
    pub fn mark_stale(&mut self, expire: Option<Duration>) {
        self.metadata.marked_stale = true;
        if let Some(expire) = expire {
            self.metadata.expires_at = deadline(Utc::now(), expire);
        }
    }

    /// Mark the entry as accessed (updates access time and count)
    pub fn mark_accessed(&mut self) {
        self.metadata.accessed_at = Utc::now();
        self.metadata.access_count += 1;
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.metadata.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now();
        if now >= self.metadata.expires_at {
            None
        } else {
            (self.metadata.expires_at - now).to_std().ok()
        }
    }

    /// Check if entry has a specific tag
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.metadata.tags.contains(tag)
    }
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the value was computed
    pub created_at: DateTime<Utc>,

    /// Last access time (for LRU tracking)
    pub accessed_at: DateTime<Utc>,

    /// From here on reads trigger a background refresh
    pub revalidate_at: DateTime<Utc>,

    /// From here on the value is unusable
    pub expires_at: DateTime<Utc>,

    /// Number of times this entry has been served
    pub access_count: u64,

    /// Name of the profile the producer bound
    pub profile: String,

    /// Tags for selective invalidation
    pub tags: Vec<Tag>,

    /// Set by tag revalidation; cleared when a new value is stored
    pub marked_stale: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    fn binding() -> CacheBinding {
        CacheBinding::new("test").tag("templates")
    }

    fn entry_with(profile: CacheProfile) -> CacheEntry {
        CacheEntry::new("key".to_string(), json!({"a": 1}), &binding(), profile)
    }

    #[test]
    fn test_cache_entry_creation() {
        let entry = entry_with(CacheProfile::from_secs(60, 300, 3600));

        assert_eq!(entry.key, "key");
        assert_eq!(entry.value, json!({"a": 1}));
        assert_eq!(entry.metadata.profile, "test");
        assert!(entry.has_tag(&Tag::from("templates")));
        assert_eq!(entry.freshness(), Freshness::Fresh);
    }

    #[test]
    fn test_freshness_transitions() {
        let entry = entry_with(CacheProfile::new(
            Duration::ZERO,
            Duration::from_millis(30),
            Duration::from_millis(80),
        ));

        assert_eq!(entry.freshness(), Freshness::Fresh);
        sleep(Duration::from_millis(40));
        assert_eq!(entry.freshness(), Freshness::Stale);
        sleep(Duration::from_millis(50));
        assert_eq!(entry.freshness(), Freshness::Expired);
        assert!(entry.is_expired());
    }

    #[test]
    fn test_freshness_at_boundaries() {
        let entry = entry_with(CacheProfile::from_secs(0, 10, 20));
        let created = entry.metadata.created_at;

        assert_eq!(entry.freshness_at(created), Freshness::Fresh);
        assert_eq!(
            entry.freshness_at(created + chrono::Duration::seconds(10)),
            Freshness::Stale
        );
        assert_eq!(
            entry.freshness_at(created + chrono::Duration::seconds(20)),
            Freshness::Expired
        );
    }

    #[test]
    fn test_mark_stale_keeps_or_rebinds_expiry() {
        let mut entry = entry_with(CacheProfile::from_secs(60, 300, 3600));
        let original_expiry = entry.metadata.expires_at;

        entry.mark_stale(None);
        assert_eq!(entry.freshness(), Freshness::Stale);
        assert_eq!(entry.metadata.expires_at, original_expiry);

        entry.mark_stale(Some(Duration::ZERO));
        assert_eq!(entry.freshness(), Freshness::Expired);
    }

    #[test]
    fn test_mark_accessed() {
        let mut entry = entry_with(CacheProfile::from_secs(60, 300, 3600));
        let initial_time = entry.metadata.accessed_at;

        sleep(Duration::from_millis(10));
        entry.mark_accessed();

        assert_eq!(entry.metadata.access_count, 1);
        assert!(entry.metadata.accessed_at > initial_time);
    }

    #[test]
    fn test_time_until_expiration() {
        let entry = entry_with(CacheProfile::from_secs(60, 300, 3600));

        let time_left = entry.time_until_expiration().unwrap();
        assert!(time_left <= Duration::from_secs(3600));
        assert!(entry.age() < Duration::from_secs(1));
    }

    #[test]
    fn test_deadline_saturates() {
        let now = Utc::now();
        assert_eq!(deadline(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
