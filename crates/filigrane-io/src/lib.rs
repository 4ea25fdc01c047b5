//! filigrane-io: Filesystem and threading around the pure pipeline.
//!
//! Owns everything that touches disk or runs in the background: the
//! crash-safe JSON documents behind the template and session stores,
//! source/asset loading with capture-date metadata, font lookup, the
//! cancellable preview scheduler and the batch export runner.

pub mod batch;
pub mod document;
pub mod fonts;
pub mod metadata;
pub mod paths;
pub mod preview;
pub mod record;
pub mod render;
pub mod session;
pub mod source;
pub mod templates;

pub use batch::{BatchError, BatchFailure, BatchReport, export_batch};
pub use document::{JsonDocument, StoreError};
pub use fonts::FontBook;
pub use paths::{AppPaths, PathsError};
pub use preview::{
    PendingPreview, PreviewRenderer, PreviewScheduler, PreviewState, PreviewStatus, PreviewTask,
    TaskOutcome,
};
pub use render::WatermarkRenderer;
pub use session::{Seed, SeedSource, SessionSnapshot, SessionStore, seed_settings};
pub use source::{LoadError, SourceImage};
pub use templates::{Template, TemplateStore};
