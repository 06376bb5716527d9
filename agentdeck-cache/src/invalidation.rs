//! Cache invalidation
//!
//! Two primitives are offered to write paths:
//! - revalidate: entries keep being served while a background refresh replaces them
//! - update: entries are dropped, the next read recomputes before returning

use crate::error::Result;
use crate::profile::ProfileRegistry;
use crate::tag::Tag;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Profile argument of a revalidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RevalidateProfile {
    /// A registered profile; its `expire` bounds how long the stale value survives
    Named(String),

    /// An ad-hoc expiry
    Inline {
        #[serde(default, with = "opt_secs", skip_serializing_if = "Option::is_none")]
        expire: Option<Duration>,
    },
}

impl RevalidateProfile {
    pub fn named(name: impl Into<String>) -> Self {
        RevalidateProfile::Named(name.into())
    }

    pub fn expire_in(expire: Duration) -> Self {
        RevalidateProfile::Inline {
            expire: Some(expire),
        }
    }

    /// Resolve the expiry to apply to revalidated entries
    pub fn resolve_expire(&self, profiles: &ProfileRegistry) -> Result<Option<Duration>> {
        match self {
            RevalidateProfile::Named(name) => Ok(Some(profiles.get(name)?.expire)),
            RevalidateProfile::Inline { expire } => Ok(*expire),
        }
    }
}

impl From<&str> for RevalidateProfile {
    fn from(name: &str) -> Self {
        RevalidateProfile::named(name)
    }
}

/// Seconds on the wire, `Duration` in memory
mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

/// How a tag is invalidated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationMode {
    Revalidate { profile: RevalidateProfile },
    Update,
}

/// Reason for cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// Entry outlived its profile's expiry
    Expired,

    /// Tag marked stale for background refresh
    TagRevalidated { tag: String },

    /// Tag dropped for immediate recompute
    TagUpdated { tag: String },
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Expired => write!(f, "profile expired"),
            InvalidationReason::TagRevalidated { tag } => write!(f, "tag revalidated: {}", tag),
            InvalidationReason::TagUpdated { tag } => write!(f, "tag updated: {}", tag),
        }
    }
}

/// Event for cache invalidation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Reason for invalidation
    pub reason: InvalidationReason,

    /// When the invalidation occurred
    pub timestamp: DateTime<Utc>,

    /// Keys that were invalidated
    pub keys: Vec<String>,

    /// Additional context
    pub context: Option<String>,
}

impl InvalidationEvent {
    /// Create a new invalidation event
    pub fn new(reason: InvalidationReason, keys: Vec<String>) -> Self {
        Self {
            reason,
            timestamp: Utc::now(),
            keys,
            context: None,
        }
    }

    /// Add context to the event
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }
}

/// Write-side view of the cache: what mutations call after they succeed
#[async_trait]
pub trait Invalidator: Send + Sync {
    /// Mark every entry carrying `tag` stale under `profile`
    async fn revalidate_tag(&self, tag: &Tag, profile: RevalidateProfile) -> Result<InvalidationEvent>;

    /// Drop every entry carrying `tag` so the next read recomputes
    async fn update_tag(&self, tag: &Tag) -> Result<InvalidationEvent>;

    /// Dispatch on `mode`
    async fn invalidate(&self, tag: &Tag, mode: InvalidationMode) -> Result<InvalidationEvent> {
        match mode {
            InvalidationMode::Revalidate { profile } => self.revalidate_tag(tag, profile).await,
            InvalidationMode::Update => self.update_tag(tag).await,
        }
    }
}
