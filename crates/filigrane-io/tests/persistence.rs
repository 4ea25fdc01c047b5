//! Integration test: templates and session snapshots survive a restart,
//! and corrupt documents are set aside instead of crashing startup.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::PathBuf;

use filigrane_io::{AppPaths, SeedSource, SessionSnapshot, SessionStore, Template, TemplateStore, seed_settings};
use filigrane_pipeline::{
    Anchor, Color, NamingRule, OutputFormat, Settings, SettingsEdit, WatermarkMode,
};

fn customized() -> Settings {
    Settings::default().apply_all([
        SettingsEdit::Text("© Studio Nord".into()),
        SettingsEdit::FontFamily("Serif".into()),
        SettingsEdit::FontSize(48),
        SettingsEdit::Bold(true),
        SettingsEdit::Color(Color::rgb(12, 34, 56)),
        SettingsEdit::TextOpacity(65),
        SettingsEdit::Shadow(true),
        SettingsEdit::Stroke(true),
        SettingsEdit::Rotation(-30.0),
        SettingsEdit::MoveTo { x: 120, y: 45 },
        SettingsEdit::Naming(NamingRule::PrefixAndSuffix),
        SettingsEdit::Prefix("pre_".into()),
        SettingsEdit::Suffix("_post".into()),
        SettingsEdit::Format(OutputFormat::Png),
        SettingsEdit::JpegQuality(70),
        SettingsEdit::TargetWidth(800),
        SettingsEdit::TargetHeight(600),
        SettingsEdit::Asset(Some(PathBuf::from("/logos/mark.png"))),
        SettingsEdit::ImageScale(0.5),
        SettingsEdit::ImageOpacity(40),
    ])
}

fn quarantined(dir: &std::path::Path, file: &str) -> Vec<PathBuf> {
    let prefix = format!("{file}.corrupt-");
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with(&prefix))
        .collect()
}

#[test]
fn template_round_trips_through_a_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::new(dir.path());

    let template = Template::new("Studio", customized()).with_description("client proofs");
    let saved = TemplateStore::new(paths.templates_file()).save(&template).unwrap();

    // A new store instance reads only what was written to disk.
    let listed = TemplateStore::new(paths.templates_file()).list();
    assert_eq!(listed.len(), 1);
    let loaded = &listed[0];
    assert_eq!(loaded.id, saved.id);
    assert_eq!(loaded.name, "Studio");
    assert_eq!(loaded.description, "client proofs");
    assert_eq!(loaded.settings, template.settings);
    assert_eq!(loaded.settings.watermark.anchor, Anchor::Custom { x: 120, y: 45 });
}

#[test]
fn template_document_uses_the_documented_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::new(dir.path());
    TemplateStore::new(paths.templates_file())
        .save(&Template::new("Names", customized()))
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(paths.templates_file()).unwrap()).unwrap();
    assert_eq!(json["schemaVersion"], 1);
    let entry = &json["templates"][0];
    for key in [
        "id",
        "name",
        "createdAt",
        "updatedAt",
        "mode",
        "position",
        "customX",
        "customY",
        "rotationDegrees",
        "namingRule",
        "outputFormat",
        "jpegQuality",
        "fontName",
        "watermarkImagePath",
    ] {
        assert!(entry.get(key).is_some(), "missing {key}");
    }
    assert_eq!(entry["mode"], "TEXT");
    assert_eq!(entry["position"], "CUSTOM");
}

#[test]
fn corrupt_template_file_is_quarantined_then_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::new(dir.path());
    fs::write(paths.templates_file(), "{ \"templates\": [ oops").unwrap();

    let store = TemplateStore::new(paths.templates_file());
    assert!(store.list().is_empty());
    let backups = quarantined(dir.path(), "templates.json");
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "{ \"templates\": [ oops");

    let saved = store.save(&Template::new("Fresh", Settings::default())).unwrap();
    let reopened = TemplateStore::new(paths.templates_file()).list();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened[0].id, saved.id);
}

#[test]
fn corrupt_session_falls_back_to_templates() {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::new(dir.path());
    fs::write(paths.session_file(), [0xFF, 0xFE, 0x00]).unwrap();

    let templates = TemplateStore::new(paths.templates_file());
    let first = templates.save(&Template::new("First", customized())).unwrap();

    let session = SessionStore::new(paths.session_file()).load();
    assert!(session.is_none());
    assert_eq!(quarantined(dir.path(), "last_session.json").len(), 1);

    let seed = seed_settings(session, &templates.list());
    assert_eq!(seed.source, SeedSource::Template(first.id.clone()));
    assert_eq!(seed.settings, first.settings);
}

#[test]
fn session_snapshot_wins_at_next_startup() {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::new(dir.path());
    let templates = TemplateStore::new(paths.templates_file());
    let applied = templates.save(&Template::new("Applied", Settings::default())).unwrap();

    let mut live = customized().apply(SettingsEdit::Mode(WatermarkMode::Image));
    live = live.apply(SettingsEdit::Anchor(Anchor::TopLeft));
    SessionStore::new(paths.session_file())
        .save(&SessionSnapshot::new(live.clone(), Some(applied.id.clone())))
        .unwrap();

    let seed = seed_settings(SessionStore::new(paths.session_file()).load(), &templates.list());
    assert_eq!(seed.source, SeedSource::Session);
    assert_eq!(seed.template_id, Some(applied.id));
    assert_eq!(seed.settings, live);
}

#[test]
fn empty_data_dir_seeds_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::new(dir.path().join("not-yet-created"));
    let seed = seed_settings(
        SessionStore::new(paths.session_file()).load(),
        &TemplateStore::new(paths.templates_file()).list(),
    );
    assert_eq!(seed.source, SeedSource::Defaults);
    assert_eq!(seed.settings, Settings::default());
}
