//! Component template store
//!
//! Reads go through the tag cache. Writes hit the repository first and only
//! invalidate after the backend accepted them:
//! - upsert uses `update_tag`, so the writer sees its own change on the next read
//! - delete uses `revalidate_tag`, so readers converge after one background refresh

use std::sync::Arc;

use agentdeck_cache::{profile, tag, Invalidator, RevalidateProfile, Tag, TagCache};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::bindings;
use crate::error::TemplateStoreError;
use crate::feed::{ChangeEvent, ChangeFeed, TemplateChange};

/// A row of the `templates` table
///
/// Columns beyond the known ones are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(
        default,
        deserialize_with = "deserialize_row_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Row id as stored: text and uuid columns arrive as strings, serial columns as numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RowId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RowId> for String {
    fn from(id: RowId) -> Self {
        match id {
            RowId::Text(s) => s,
            RowId::Number(n) => n.to_string(),
        }
    }
}

fn deserialize_row_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RowId>::deserialize(d)?.map(String::from))
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            content: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Acknowledgement returned by template writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAck {
    pub ok: bool,
}

impl WriteAck {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Storage backend for templates
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// All rows, most recently updated first
    async fn list_templates(&self) -> Result<Vec<Template>, TemplateStoreError>;

    /// Insert or merge a row, returning its id
    async fn upsert_template(&self, template: &Template) -> Result<String, TemplateStoreError>;

    async fn delete_template(&self, id: &str) -> Result<(), TemplateStoreError>;
}

/// Cached reads and invalidating writes over a `TemplateRepository`
#[derive(Clone)]
pub struct TemplateStore {
    repository: Arc<dyn TemplateRepository>,
    cache: TagCache,
    invalidator: Arc<dyn Invalidator>,
    feed: ChangeFeed,
}

impl TemplateStore {
    /// Create a store whose writes invalidate `cache` itself
    pub fn new(repository: Arc<dyn TemplateRepository>, cache: TagCache, feed: ChangeFeed) -> Self {
        let invalidator: Arc<dyn Invalidator> = Arc::new(cache.clone());
        Self {
            repository,
            cache,
            invalidator,
            feed,
        }
    }

    /// Route write-side invalidations somewhere other than the read cache
    pub fn with_invalidator(mut self, invalidator: Arc<dyn Invalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// All templates, cached under `component-templates` with the hours profile
    ///
    /// Backend errors are returned, never cached.
    pub async fn component_templates(&self) -> Result<Vec<Template>, TemplateStoreError> {
        let repository = self.repository.clone();
        self.cache
            .get_or_compute(
                bindings::component_templates_key(),
                &bindings::component_templates(),
                move || async move { repository.list_templates().await },
            )
            .await
    }

    /// Insert or update a template; the next read reflects it
    pub async fn upsert_component_template(
        &self,
        template: Template,
    ) -> Result<WriteAck, TemplateStoreError> {
        let id = self.repository.upsert_template(&template).await?;

        self.invalidator
            .update_tag(&Tag::from(tag::COMPONENT_TEMPLATES))
            .await?;

        let event = if template.id.is_some() {
            ChangeEvent::Update
        } else {
            ChangeEvent::Insert
        };
        info!("Upserted component template: {} ({})", template.name, id);
        self.feed
            .publish(TemplateChange::upserted(event, template.with_id(id)));

        Ok(WriteAck::ok())
    }

    /// Delete a template; readers converge after a background refresh
    pub async fn delete_component_template(&self, id: &str) -> Result<WriteAck, TemplateStoreError> {
        self.repository.delete_template(id).await?;

        self.invalidator
            .revalidate_tag(
                &Tag::from(tag::COMPONENT_TEMPLATES),
                RevalidateProfile::named(profile::HOURS),
            )
            .await?;

        info!("Deleted component template: {}", id);
        self.feed.publish(TemplateChange::deleted(id));

        Ok(WriteAck::ok())
    }
}
