//! Named cache-life profiles
//!
//! A profile is a `(stale, revalidate, expire)` triple:
//! - `stale`: how long a client may reuse a value without asking again
//! - `revalidate`: age after which a read serves the cached value and refreshes it in the background
//! - `expire`: age after which the cached value is unusable and must be recomputed before returning

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::warn;

pub const SECONDS: &str = "seconds";
pub const MINUTES: &str = "minutes";
pub const HOURS: &str = "hours";
pub const DAYS: &str = "days";
pub const AGENTS: &str = "agents";

/// Freshness windows for one class of cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheProfile {
    pub stale: Duration,
    pub revalidate: Duration,
    pub expire: Duration,
}

/// An ordering problem found in a profile. Reported, never corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOrdering {
    StaleExceedsRevalidate,
    RevalidateExceedsExpire,
}

impl fmt::Display for ProfileOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileOrdering::StaleExceedsRevalidate => write!(f, "stale exceeds revalidate"),
            ProfileOrdering::RevalidateExceedsExpire => write!(f, "revalidate exceeds expire"),
        }
    }
}

impl CacheProfile {
    pub fn new(stale: Duration, revalidate: Duration, expire: Duration) -> Self {
        Self {
            stale,
            revalidate,
            expire,
        }
    }

    pub fn from_secs(stale: u64, revalidate: u64, expire: u64) -> Self {
        Self::new(
            Duration::from_secs(stale),
            Duration::from_secs(revalidate),
            Duration::from_secs(expire),
        )
    }

    /// Check `stale <= revalidate <= expire`
    pub fn check_ordering(&self) -> Vec<ProfileOrdering> {
        let mut problems = Vec::new();
        if self.stale > self.revalidate {
            problems.push(ProfileOrdering::StaleExceedsRevalidate);
        }
        if self.revalidate > self.expire {
            problems.push(ProfileOrdering::RevalidateExceedsExpire);
        }
        problems
    }

    /// Window during which a stale value may still be served while a refresh runs
    pub fn stale_while_revalidate(&self) -> Duration {
        self.expire.saturating_sub(self.stale)
    }

    /// `Cache-Control` header value advertising this profile to HTTP clients
    pub fn cache_control(&self) -> String {
        format!(
            "public, max-age={}, stale-while-revalidate={}",
            self.stale.as_secs(),
            self.stale_while_revalidate().as_secs()
        )
    }
}

/// Render a duration the way humans read cache windows ("5 minutes", "1 hour")
pub fn humanize(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (amount, unit) = if secs >= 86_400 && secs % 86_400 == 0 {
        (secs / 86_400, "day")
    } else if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    if amount == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", amount, unit)
    }
}

/// Registry of named profiles
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, CacheProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileRegistry {
    /// Registry with no profiles at all
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// The five profiles every producer in the gateway binds to
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(SECONDS, CacheProfile::from_secs(0, 1, 1));
        // stale > revalidate here; kept as configured upstream
        registry.register(MINUTES, CacheProfile::from_secs(300, 60, 3600));
        registry.register(HOURS, CacheProfile::from_secs(300, 3600, 86_400));
        registry.register(DAYS, CacheProfile::from_secs(300, 86_400, 604_800));
        registry.register(AGENTS, CacheProfile::from_secs(60, 300, 3600));
        registry
    }

    /// Register or replace a profile. Ordering problems are logged, not rejected.
    pub fn register(&mut self, name: impl Into<String>, profile: CacheProfile) {
        let name = name.into();
        for problem in profile.check_ordering() {
            warn!(profile = %name, "Cache profile ordering: {}", problem);
        }
        self.profiles.insert(name, profile);
    }

    pub fn get(&self, name: &str) -> Result<CacheProfile> {
        self.profiles
            .get(name)
            .copied()
            .ok_or_else(|| CacheError::UnknownProfile(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheProfile)> {
        self.profiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
