//! Template store.
//!
//! All templates live in one schema-versioned document,
//! `{"schemaVersion": 1, "templates": [...]}`. Every save and delete
//! rewrites the whole document through [`JsonDocument`], so a crash
//! leaves either the old or the new collection on disk.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use filigrane_pipeline::Settings;
use serde::{Deserialize, Serialize};

use crate::document::{JsonDocument, StoreError};
use crate::record::SettingsRecord;

/// Version written into new documents.
pub const SCHEMA_VERSION: u32 = 1;

/// A named, persisted bundle of watermark and export parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Unique, immutable identifier (UUID v4 for templates created here).
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settings: Settings,
}

impl Template {
    /// A new template with a fresh id. Timestamps are stamped on save.
    #[must_use]
    pub fn new(name: impl Into<String>, settings: Settings) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
            settings,
        }
    }

    /// Builder-style description setter.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One template as written to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TemplateRecord {
    id: String,
    name: String,
    description: String,
    created_at: i64,
    updated_at: i64,
    #[serde(flatten)]
    settings: SettingsRecord,
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

impl From<&Template> for TemplateRecord {
    fn from(template: &Template) -> Self {
        Self {
            id: template.id.clone(),
            name: template.name.clone(),
            description: template.description.clone(),
            created_at: template.created_at.timestamp_millis(),
            updated_at: template.updated_at.timestamp_millis(),
            settings: SettingsRecord::from(&template.settings),
        }
    }
}

impl From<TemplateRecord> for Template {
    fn from(record: TemplateRecord) -> Self {
        Self {
            settings: record.settings.to_settings(),
            id: record.id,
            name: record.name,
            description: record.description,
            created_at: from_millis(record.created_at),
            updated_at: from_millis(record.updated_at),
        }
    }
}

/// The whole persisted collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TemplateDocument {
    schema_version: u32,
    templates: Vec<TemplateRecord>,
}

impl Default for TemplateDocument {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            templates: Vec::new(),
        }
    }
}

/// CRUD over the template document.
///
/// Name collisions are not the store's business: two templates may share
/// a name, and callers that want "overwrite by name" look the existing
/// one up with [`TemplateStore::find_by_name`] first.
#[derive(Debug)]
pub struct TemplateStore {
    document: JsonDocument<TemplateDocument>,
}

impl TemplateStore {
    /// A store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            document: JsonDocument::new(path),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        self.document.path()
    }

    fn load_document(&self) -> Result<TemplateDocument, StoreError> {
        let document = self.document.load()?.unwrap_or_default();
        if document.schema_version != SCHEMA_VERSION {
            tracing::warn!(
                found = document.schema_version,
                expected = SCHEMA_VERSION,
                "Template document has an unexpected schema version, loading anyway"
            );
        }
        Ok(document)
    }

    /// All templates in stored order.
    ///
    /// A missing or corrupt document yields an empty list; an unreadable
    /// one is logged and also yields an empty list.
    #[must_use]
    pub fn list(&self) -> Vec<Template> {
        match self.load_document() {
            Ok(document) => document.templates.into_iter().map(Template::from).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read templates");
                Vec::new()
            }
        }
    }

    /// The template with `id`, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Template> {
        self.list().into_iter().find(|t| t.id == id)
    }

    /// The first template whose name matches `name` (trimmed, case
    /// sensitive).
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Template> {
        let name = name.trim();
        self.list().into_iter().find(|t| t.name.trim() == name)
    }

    /// Insert `template`, or overwrite the stored one with the same id in
    /// place.
    ///
    /// `updated_at` is stamped now; on overwrite the stored `created_at`
    /// is kept. Returns the template as stored.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the existing document cannot be read
    /// or the new one cannot be written.
    pub fn save(&self, template: &Template) -> Result<Template, StoreError> {
        let mut document = self.load_document()?;
        let mut stored = template.clone();
        stored.updated_at = Utc::now();

        if let Some(slot) = document.templates.iter_mut().find(|r| r.id == template.id) {
            stored.created_at = from_millis(slot.created_at);
            *slot = TemplateRecord::from(&stored);
            tracing::info!(id = %stored.id, name = %stored.name, "Template updated");
        } else {
            stored.created_at = stored.updated_at.min(template.created_at);
            document.templates.push(TemplateRecord::from(&stored));
            tracing::info!(id = %stored.id, name = %stored.name, "Template created");
        }

        document.schema_version = SCHEMA_VERSION;
        self.document.save(&document)?;
        Ok(stored)
    }

    /// Remove the template with `id`. Returns `false` if there was none,
    /// in which case nothing is written.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the document cannot be read or
    /// rewritten.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut document = self.load_document()?;
        let before = document.templates.len();
        document.templates.retain(|r| r.id != id);
        if document.templates.len() == before {
            return Ok(false);
        }
        document.schema_version = SCHEMA_VERSION;
        self.document.save(&document)?;
        tracing::info!(id, "Template deleted");
        Ok(true)
    }
}
