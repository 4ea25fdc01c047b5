//! Command-line arguments.
//!
//! Watermark and export flags are all optional: anything not given keeps
//! the value seeded from the last session (or template, or defaults).
//! Each flag that is given becomes one [`SettingsEdit`].

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use filigrane_pipeline::{
    Anchor, Color, NamingRule, OutputFormat, ResizeFilter, SettingsEdit, WatermarkMode,
};

/// Overlay text or image watermarks onto photographs.
#[derive(Debug, Parser)]
#[command(name = "filigrane", version)]
pub struct Cli {
    /// Directory holding templates and the last session.
    ///
    /// Defaults to the platform configuration directory.
    #[arg(long, global = true, env = "FILIGRANE_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Extra directory to search for fonts (repeatable). Searched before
    /// the system font directories.
    #[arg(
        long = "font-dir",
        global = true,
        env = "FILIGRANE_FONT_DIRS",
        value_delimiter = ',',
        value_name = "DIR"
    )]
    pub font_dirs: Vec<PathBuf>,

    /// Resampling filter for watermark images and export resizing.
    #[arg(long, global = true, value_enum, default_value_t = Filter::Lanczos3)]
    pub filter: Filter,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render one photo as the preview would show it.
    Render {
        /// Photo to watermark.
        image: PathBuf,

        /// Where to write the result. The extension picks the format.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        watermark: WatermarkArgs,
    },

    /// Watermark, resize and write a batch of photos.
    Export {
        /// Photos to export.
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Output directory. Must not be the folder of any input photo.
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        #[command(flatten)]
        watermark: WatermarkArgs,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Manage saved templates.
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Inspect or discard the remembered session.
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Debug, Subcommand)]
pub enum TemplateCommand {
    /// List saved templates.
    List,

    /// Print one template's settings.
    Show {
        /// Template id or name.
        key: String,
    },

    /// Save the current settings, plus any flags, as a template. An
    /// existing template with the same name is overwritten.
    Save {
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        #[command(flatten)]
        watermark: WatermarkArgs,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Delete a template.
    Delete {
        /// Template id or name.
        key: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Print the remembered session.
    Show,
    /// Forget the remembered session.
    Clear,
}

#[derive(Debug, Clone, Default, Args)]
pub struct WatermarkArgs {
    /// Watermark kind (text, image).
    #[arg(long)]
    pub mode: Option<WatermarkMode>,

    /// Watermark text. Empty means the photo's capture date.
    #[arg(long)]
    pub text: Option<String>,

    /// Font family (e.g. `SansSerif`, `Serif`, `DejaVuSans`).
    #[arg(long)]
    pub font: Option<String>,

    /// Font size in pixels.
    #[arg(long)]
    pub font_size: Option<u32>,

    #[arg(long, value_name = "BOOL")]
    pub bold: Option<bool>,

    #[arg(long, value_name = "BOOL")]
    pub italic: Option<bool>,

    /// Text color as `#RGB` or `#RRGGBB`.
    #[arg(long)]
    pub color: Option<Color>,

    /// Text opacity, 0-100.
    #[arg(long, value_name = "PERCENT")]
    pub opacity: Option<i64>,

    /// Draw a drop shadow behind the text.
    #[arg(long, value_name = "BOOL")]
    pub shadow: Option<bool>,

    /// Outline the text in a contrasting color.
    #[arg(long, value_name = "BOOL")]
    pub stroke: Option<bool>,

    /// Watermark image (PNG with transparency works best).
    #[arg(long, value_name = "PATH")]
    pub watermark_image: Option<PathBuf>,

    /// Watermark image scale factor.
    #[arg(long, value_name = "FACTOR")]
    pub image_scale: Option<f64>,

    /// Watermark image opacity, 0-100.
    #[arg(long, value_name = "PERCENT")]
    pub image_opacity: Option<i64>,

    /// Rotation in degrees, clockwise.
    #[arg(long, allow_negative_numbers = true, value_name = "DEG")]
    pub rotation: Option<f64>,

    /// Preset position (e.g. `bottom-right`, `center`).
    #[arg(long, conflicts_with = "at")]
    pub anchor: Option<Anchor>,

    /// Custom top-left position as "X,Y" in photo pixels.
    #[arg(long, value_name = "X,Y", value_parser = parse_origin, allow_hyphen_values = true)]
    pub at: Option<(i32, i32)>,
}

impl WatermarkArgs {
    pub fn edits(&self) -> Vec<SettingsEdit> {
        let mut edits = Vec::new();
        edits.extend(self.mode.map(SettingsEdit::Mode));
        edits.extend(self.text.clone().map(SettingsEdit::Text));
        edits.extend(self.font.clone().map(SettingsEdit::FontFamily));
        edits.extend(self.font_size.map(SettingsEdit::FontSize));
        edits.extend(self.bold.map(SettingsEdit::Bold));
        edits.extend(self.italic.map(SettingsEdit::Italic));
        edits.extend(self.color.map(SettingsEdit::Color));
        edits.extend(self.opacity.map(SettingsEdit::TextOpacity));
        edits.extend(self.shadow.map(SettingsEdit::Shadow));
        edits.extend(self.stroke.map(SettingsEdit::Stroke));
        edits.extend(self.watermark_image.clone().map(|p| SettingsEdit::Asset(Some(p))));
        edits.extend(self.image_scale.map(SettingsEdit::ImageScale));
        edits.extend(self.image_opacity.map(SettingsEdit::ImageOpacity));
        edits.extend(self.rotation.map(SettingsEdit::Rotation));
        edits.extend(self.anchor.map(SettingsEdit::Anchor));
        edits.extend(self.at.map(|(x, y)| SettingsEdit::MoveTo { x, y }));
        edits
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct ExportArgs {
    /// Output naming rule (keep, prefix, suffix, prefix-and-suffix).
    #[arg(long)]
    pub naming: Option<NamingRule>,

    #[arg(long)]
    pub prefix: Option<String>,

    #[arg(long)]
    pub suffix: Option<String>,

    /// Output format (jpeg, png).
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// JPEG quality, 0-100.
    #[arg(long)]
    pub quality: Option<i64>,

    /// Resize by percentage, 10-200. Anything but 100 overrides
    /// `--width` and `--height`.
    #[arg(long, value_name = "PERCENT")]
    pub scale: Option<i64>,

    /// Output width in pixels, 0 keeps the original.
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels, 0 keeps the original.
    #[arg(long)]
    pub height: Option<u32>,
}

impl ExportArgs {
    pub fn edits(&self) -> Vec<SettingsEdit> {
        let mut edits = Vec::new();
        edits.extend(self.naming.map(SettingsEdit::Naming));
        edits.extend(self.prefix.clone().map(SettingsEdit::Prefix));
        edits.extend(self.suffix.clone().map(SettingsEdit::Suffix));
        edits.extend(self.format.map(SettingsEdit::Format));
        edits.extend(self.quality.map(SettingsEdit::JpegQuality));
        edits.extend(self.scale.map(SettingsEdit::ScalePercent));
        edits.extend(self.width.map(SettingsEdit::TargetWidth));
        edits.extend(self.height.map(SettingsEdit::TargetHeight));
        edits
    }
}

/// Resampling filter selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Filter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<Filter> for ResizeFilter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

/// Parse `"X,Y"` into a pixel origin.
fn parse_origin(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("position must be 'X,Y', got: '{s}'"))?;
    let x = x.trim().parse().map_err(|e| format!("invalid X '{x}': {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("invalid Y '{y}': {e}"))?;
    Ok((x, y))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn origins_parse_with_signs_and_spaces() {
        assert_eq!(parse_origin("10,20"), Ok((10, 20)));
        assert_eq!(parse_origin(" -5 , 7 "), Ok((-5, 7)));
        assert!(parse_origin("10").is_err());
        assert!(parse_origin("a,1").is_err());
    }

    #[test]
    fn only_given_flags_become_edits() {
        let cli = Cli::try_parse_from([
            "filigrane",
            "render",
            "in.jpg",
            "-o",
            "out.png",
            "--text",
            "hello",
            "--anchor",
            "top-left",
            "--rotation",
            "-45",
            "--bold",
            "true",
        ])
        .unwrap();
        let Command::Render { watermark, .. } = cli.command else {
            unreachable!("parsed a render command");
        };
        assert_eq!(
            watermark.edits(),
            vec![
                SettingsEdit::Text("hello".into()),
                SettingsEdit::Bold(true),
                SettingsEdit::Rotation(-45.0),
                SettingsEdit::Anchor(Anchor::TopLeft),
            ]
        );
    }

    #[test]
    fn custom_position_becomes_a_move() {
        let cli = Cli::try_parse_from(["filigrane", "render", "in.jpg", "-o", "o.png", "--at", "-3,4"]).unwrap();
        let Command::Render { watermark, .. } = cli.command else {
            unreachable!("parsed a render command");
        };
        assert_eq!(watermark.edits(), vec![SettingsEdit::MoveTo { x: -3, y: 4 }]);
    }

    #[test]
    fn export_flags_map_to_export_edits() {
        let cli = Cli::try_parse_from([
            "filigrane",
            "export",
            "a.jpg",
            "b.jpg",
            "--out-dir",
            "out",
            "--naming",
            "prefix",
            "--format",
            "png",
            "--scale",
            "50",
        ])
        .unwrap();
        let Command::Export {
            images,
            out_dir,
            export,
            ..
        } = cli.command
        else {
            unreachable!("parsed an export command");
        };
        assert_eq!(images.len(), 2);
        assert_eq!(out_dir, Some(PathBuf::from("out")));
        assert_eq!(
            export.edits(),
            vec![
                SettingsEdit::Naming(NamingRule::Prefix),
                SettingsEdit::Format(OutputFormat::Png),
                SettingsEdit::ScalePercent(50),
            ]
        );
    }

    #[test]
    fn export_requires_images() {
        assert!(Cli::try_parse_from(["filigrane", "export", "--out-dir", "x"]).is_err());
    }
}
