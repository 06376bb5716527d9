//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type: call site plus arguments
pub type CacheKey = String;

/// Cache value type: producers' outputs are stored as JSON
pub type CacheValue = serde_json::Value;

/// Where an entry stands relative to its profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Served without an upstream call
    Fresh,
    /// Served, and a background refresh is started
    Stale,
    /// Unusable; recomputed before returning
    Expired,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Fresh => write!(f, "fresh"),
            Freshness::Stale => write!(f, "stale"),
            Freshness::Expired => write!(f, "expired"),
        }
    }
}

/// Statistics and metrics for cache performance monitoring
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Reads served from a fresh entry
    pub hits: u64,

    /// Reads served from a stale entry (a refresh was scheduled)
    pub stale_hits: u64,

    /// Reads that found no usable entry
    pub misses: u64,

    /// Synchronous computes performed for misses
    pub recomputes: u64,

    /// Background refreshes that stored a new value
    pub background_refreshes: u64,

    /// Background refreshes whose compute failed
    pub refresh_failures: u64,

    /// `revalidate_tag` calls
    pub revalidations: u64,

    /// `update_tag` calls
    pub updates: u64,

    /// Number of entries currently in cache
    pub entries: usize,

    /// Number of evictions due to the entry limit
    pub evictions_size: u64,

    /// Number of evictions due to expiry
    pub evictions_ttl: u64,
}

impl CacheStats {
    /// Share of reads answered from cache (fresh or stale), as a percentage
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            (served as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Calculate total evictions
    pub fn total_evictions(&self) -> u64 {
        self.evictions_size + self.evictions_ttl
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, stale_hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, evictions: {} }}",
            self.hits,
            self.stale_hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.total_evictions()
        )
    }
}
