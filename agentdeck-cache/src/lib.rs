//! # agentdeck-cache
//!
//! A tag-indexed cache with named cache-life profiles, used by the agentdeck
//! gateway to cache reads of backend state.
//!
//! ## Features
//!
//! - **Named profiles**: each producer binds a `(stale, revalidate, expire)` triple
//! - **Stale-while-revalidate**: stale values are served while one background refresh runs
//! - **Single compute per key**: concurrent misses on one key share a single compute
//! - **Tag invalidation**: `revalidate_tag` for eventual consistency, `update_tag` for read-your-writes
//! - **LRU bound**: least recently used entries are evicted past `max_entries`
//!
//! ## Example
//!
//! ```rust
//! use agentdeck_cache::{profile, tag, CacheBinding, CacheConfig, CacheError, TagCache};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = TagCache::new(CacheConfig::default());
//! let binding = CacheBinding::new(profile::DAYS).tag(tag::llm_context("gpt-4"));
//!
//! let window: u32 = cache
//!     .get_or_compute("context_window?model=gpt-4".to_string(), &binding, || async {
//!         Ok::<_, CacheError>(8192)
//!     })
//!     .await?;
//! assert_eq!(window, 8192);
//!
//! // After a write, force the next read to recompute
//! cache.update_tag(&tag::llm_context("gpt-4")).await?;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod config;
pub mod entry;
pub mod error;
pub mod invalidation;
pub mod profile;
pub mod store;
pub mod tag;
pub mod types;

pub use binding::{CacheBinding, CacheKeyBuilder};
pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::{CacheEntry, CacheMetadata};
pub use error::{CacheError, Result};
pub use invalidation::{
    InvalidationEvent, InvalidationMode, InvalidationReason, Invalidator, RevalidateProfile,
};
pub use profile::{CacheProfile, ProfileOrdering, ProfileRegistry};
pub use store::{start_auto_cleanup, TagCache};
pub use tag::Tag;
pub use types::{CacheKey, CacheStats, CacheValue, Freshness};
