//! Session store and startup seeding.
//!
//! The session document holds the settings that were current at the last
//! graceful shutdown: `{lastTemplateId?, lastSettings, savedAt}`. It uses
//! the same atomic-write and quarantine discipline as the template store.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use filigrane_pipeline::Settings;
use serde::{Deserialize, Serialize};

use crate::document::{JsonDocument, StoreError};
use crate::record::SettingsRecord;
use crate::templates::Template;

/// The last in-memory settings, persisted without a name.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Template that was applied when the snapshot was taken, if any.
    pub last_template_id: Option<String>,
    pub settings: Settings,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Snapshot `settings` now.
    #[must_use]
    pub fn new(settings: Settings, last_template_id: Option<String>) -> Self {
        Self {
            last_template_id,
            settings,
            saved_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SessionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    last_template_id: Option<String>,
    last_settings: SettingsRecord,
    saved_at: i64,
}

/// Persistence for the single most recent [`SessionSnapshot`].
#[derive(Debug)]
pub struct SessionStore {
    document: JsonDocument<SessionRecord>,
}

impl SessionStore {
    /// A store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            document: JsonDocument::new(path),
        }
    }

    /// The stored snapshot, or `None` if there is none, it was corrupt
    /// (and has been quarantined), or it could not be read.
    #[must_use]
    pub fn load(&self) -> Option<SessionSnapshot> {
        let record = match self.document.load() {
            Ok(record) => record?,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read last session");
                return None;
            }
        };
        Some(SessionSnapshot {
            last_template_id: record.last_template_id.filter(|id| !id.is_empty()),
            settings: record.last_settings.to_settings(),
            saved_at: DateTime::from_timestamp_millis(record.saved_at).unwrap_or_default(),
        })
    }

    /// Overwrite the stored snapshot, stamping `savedAt` now. Returns the
    /// snapshot as stored.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the document cannot be written.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<SessionSnapshot, StoreError> {
        let stored = SessionSnapshot {
            saved_at: Utc::now(),
            ..snapshot.clone()
        };
        self.document.save(&SessionRecord {
            last_template_id: stored.last_template_id.clone(),
            last_settings: SettingsRecord::from(&stored.settings),
            saved_at: stored.saved_at.timestamp_millis(),
        })?;
        tracing::debug!(path = %self.document.path().display(), "Session saved");
        Ok(stored)
    }

    /// Forget the stored snapshot. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<bool, StoreError> {
        self.document.remove()
    }
}

/// Where the startup settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedSource {
    Session,
    /// The first stored template, by id.
    Template(String),
    Defaults,
}

/// Startup settings plus their origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub settings: Settings,
    pub source: SeedSource,
    /// Template to mark as applied, if known.
    pub template_id: Option<String>,
}

/// Choose the startup settings: the session snapshot if there is one,
/// else the first template, else the built-in defaults.
#[must_use]
pub fn seed_settings(session: Option<SessionSnapshot>, templates: &[Template]) -> Seed {
    if let Some(snapshot) = session {
        return Seed {
            settings: snapshot.settings,
            source: SeedSource::Session,
            template_id: snapshot.last_template_id,
        };
    }
    templates.first().map_or_else(
        || Seed {
            settings: Settings::default(),
            source: SeedSource::Defaults,
            template_id: None,
        },
        |template| Seed {
            settings: template.settings.clone(),
            source: SeedSource::Template(template.id.clone()),
            template_id: Some(template.id.clone()),
        },
    )
}
