//! filigrane: command-line front end.
//!
//! Seeds the working settings the way the application does at startup
//! (last session, else first template, else defaults), applies any
//! flags on top, then renders, exports or manages templates.
//!
//! # Usage
//!
//! ```text
//! filigrane render photo.jpg -o preview.png --text "© Studio" --anchor bottom-right
//! filigrane export shots/*.jpg --out-dir out --naming suffix --scale 50
//! filigrane template save "Client proofs" --opacity 40 --rotation -30
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod args;

use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use filigrane_io::{
    AppPaths, FontBook, PreviewScheduler, Seed, SessionSnapshot, SessionStore, SourceImage,
    TaskOutcome, Template, TemplateStore, WatermarkRenderer, export_batch, seed_settings,
};
use filigrane_pipeline::{OutputFormat, ResizeFilter, Settings, SettingsEdit};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::{Cli, Command, SessionCommand, TemplateCommand};

type CliResult = Result<ExitCode, Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "filigrane=info,filigrane_io=info",
        1 => "filigrane=debug,filigrane_io=debug",
        _ => "filigrane=trace,filigrane_io=trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Stores and rendering resources shared by every command.
struct App {
    templates: TemplateStore,
    sessions: SessionStore,
    renderer: WatermarkRenderer,
}

impl App {
    fn open(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let paths = AppPaths::resolve(cli.data_dir.clone())?;
        tracing::debug!(data_dir = %paths.data_dir().display(), "Using data directory");
        let fonts = FontBook::with_system_dirs(cli.font_dirs.clone());
        let filter: ResizeFilter = cli.filter.into();
        Ok(Self {
            templates: TemplateStore::new(paths.templates_file()),
            sessions: SessionStore::new(paths.session_file()),
            renderer: WatermarkRenderer::new(Arc::new(fonts)).with_filter(filter),
        })
    }

    /// The startup settings.
    fn seed(&self) -> Seed {
        let seed = seed_settings(self.sessions.load(), &self.templates.list());
        tracing::debug!(source = ?seed.source, "Settings seeded");
        seed
    }

    /// Template by id, else by name.
    fn find_template(&self, key: &str) -> Option<Template> {
        self.templates.get(key).or_else(|| self.templates.find_by_name(key))
    }
}

fn run(cli: Cli) -> CliResult {
    let app = App::open(&cli)?;
    match cli.command {
        Command::Render {
            image,
            output,
            watermark,
        } => {
            let settings = app.seed().settings.apply_all(watermark.edits());
            render(&app, &settings, &image, &output)
        }
        Command::Export {
            images,
            out_dir,
            watermark,
            export,
        } => {
            let seed = app.seed();
            let mut edits = watermark.edits();
            edits.extend(export.edits());
            edits.extend(out_dir.map(|dir| SettingsEdit::OutputDir(Some(dir))));
            let settings = seed.settings.apply_all(edits);
            export_all(&app, settings, seed.template_id, &images)
        }
        Command::Template(command) => template(&app, command),
        Command::Session(command) => session(&app, &command),
    }
}

/// Render one photo through the preview scheduler and write the frame.
fn render(app: &App, settings: &Settings, image: &Path, output: &Path) -> CliResult {
    let source = Arc::new(SourceImage::open(image)?);
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let scheduler = PreviewScheduler::new(app.renderer.clone(), runtime.handle().clone());

    let pending = scheduler.request(settings.clone(), source);
    match runtime.block_on(pending.outcome()) {
        TaskOutcome::Published => {}
        TaskOutcome::Failed(reason) => return Err(reason.into()),
        TaskOutcome::Discarded => return Err("preview was superseded".into()),
    }
    let frame = scheduler.snapshot().frame.ok_or("no frame was published")?;

    let format = output
        .extension()
        .and_then(|ext| OutputFormat::from_str(&ext.to_string_lossy()).ok())
        .unwrap_or(settings.export.format);
    let bytes = filigrane_export::encode(&frame, format, settings.export.jpeg_quality)?;
    std::fs::write(output, bytes)?;

    eprintln!(
        "Wrote {} ({}x{})",
        output.display(),
        frame.width(),
        frame.height()
    );
    Ok(ExitCode::SUCCESS)
}

/// Batch export, then remember the settings for next time.
fn export_all(
    app: &App,
    settings: Settings,
    template_id: Option<String>,
    images: &[std::path::PathBuf],
) -> CliResult {
    let report = export_batch(images, &settings, &app.renderer)?;
    for failure in &report.failures {
        eprintln!("failed: {}: {}", failure.path.display(), failure.reason);
    }
    println!("Exported {}/{} images", report.succeeded, report.attempted);

    if let Err(e) = app.sessions.save(&SessionSnapshot::new(settings, template_id)) {
        tracing::warn!(error = %e, "Could not save session");
    }

    Ok(if report.failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn template(app: &App, command: TemplateCommand) -> CliResult {
    match command {
        TemplateCommand::List => {
            let templates = app.templates.list();
            if templates.is_empty() {
                println!("No templates saved.");
            }
            for t in templates {
                println!(
                    "{}  {}  (updated {})",
                    t.id,
                    t.name,
                    t.updated_at.format("%Y-%m-%d %H:%M")
                );
                if !t.description.is_empty() {
                    println!("    {}", t.description);
                }
            }
        }
        TemplateCommand::Show { key } => {
            let t = app
                .find_template(&key)
                .ok_or_else(|| format!("no template named or with id '{key}'"))?;
            println!("{} ({})", t.name, t.id);
            if !t.description.is_empty() {
                println!("{}", t.description);
            }
            println!("{}", serde_json::to_string_pretty(&t.settings)?);
        }
        TemplateCommand::Save {
            name,
            description,
            watermark,
            export,
        } => {
            let mut edits = watermark.edits();
            edits.extend(export.edits());
            let settings = app.seed().settings.apply_all(edits);
            let template = match app.templates.find_by_name(&name) {
                Some(existing) => Template {
                    description,
                    settings,
                    ..existing
                },
                None => Template::new(name, settings).with_description(description),
            };
            let saved = app.templates.save(&template)?;
            println!("Saved template '{}' ({})", saved.name, saved.id);
        }
        TemplateCommand::Delete { key } => {
            let t = app
                .find_template(&key)
                .ok_or_else(|| format!("no template named or with id '{key}'"))?;
            if app.templates.delete(&t.id)? {
                println!("Deleted template '{}'", t.name);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn session(app: &App, command: &SessionCommand) -> CliResult {
    match command {
        SessionCommand::Show => match app.sessions.load() {
            Some(snapshot) => {
                println!("Saved {}", snapshot.saved_at.format("%Y-%m-%d %H:%M:%S"));
                if let Some(id) = &snapshot.last_template_id {
                    println!("Template {id}");
                }
                println!("{}", serde_json::to_string_pretty(&snapshot.settings)?);
            }
            None => println!("No saved session."),
        },
        SessionCommand::Clear => {
            if app.sessions.clear()? {
                println!("Session cleared.");
            } else {
                println!("No saved session.");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
