use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use passrs::{
    config,
    export::{self, OutputFormat},
    overlay::OverlayRenderer,
    photo, sheet, upload, FaceMeshPipeline,
};
use passrs_vision::Thresholds;

#[derive(Parser)]
#[command(name = "passrs")]
#[command(
    version,
    about = "Passport photo maker - crop, scale and lay out a portrait to regulation size"
)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a portrait into a calibrated passport photo
    Process {
        /// JPG or PNG portrait
        input: PathBuf,
        /// Output file (format from extension unless --format is given)
        #[arg(short, long, default_value = "passport_photo.jpg")]
        output: PathBuf,
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
        /// Also write a preview with measurement guides
        #[arg(long)]
        preview: Option<PathBuf>,
        /// Also write a 4x6 print sheet with six copies
        #[arg(long)]
        sheet: Option<PathBuf>,
        /// Frame each sheet tile with a black border of this many pixels
        /// (configured thickness when no value is given)
        #[arg(long, num_args = 0..=1)]
        border: Option<Option<u32>>,
        /// Print a JSON report to stdout
        #[arg(long)]
        json: bool,
    },
    /// Lay out an already calibrated photo six times on a 4x6 sheet
    Sheet {
        input: PathBuf,
        #[arg(short, long, default_value = "4x6_passport_photo.jpg")]
        output: PathBuf,
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
        #[arg(long, num_args = 0..=1)]
        border: Option<Option<u32>>,
    },
    /// Write the default config file
    InitConfig,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let cfg = config::load_config(config_path)?;

    match cli.command {
        Commands::Process {
            input,
            output,
            format,
            preview,
            sheet,
            border,
            json,
        } => process(
            &cfg,
            &input,
            &output,
            format,
            preview.as_deref(),
            sheet.as_deref(),
            border,
            json,
        ),
        Commands::Sheet {
            input,
            output,
            format,
            border,
        } => make_sheet(&cfg, &input, &output, format, border),
        Commands::InitConfig => init_config(&cfg, config_path),
        Commands::Config => open_config(config_path),
    }
}

/// `--border` alone means the configured thickness, `--border 0` none.
fn border_thickness(cfg: &config::Config, border: Option<Option<u32>>) -> Option<u32> {
    border.map(|t| t.unwrap_or(cfg.sheet.border_px))
}

fn output_format(path: &Path, format: Option<OutputFormat>) -> OutputFormat {
    format
        .or_else(|| OutputFormat::from_path(path))
        .unwrap_or(OutputFormat::Jpeg)
}

/// Resolve the format and a sanitized file name for a user-supplied output.
fn output_target(path: &Path, format: Option<OutputFormat>) -> (PathBuf, OutputFormat) {
    let format = output_format(path, format);
    (export::output_path(path, format), format)
}

#[allow(clippy::too_many_arguments)]
fn process(
    cfg: &config::Config,
    input: &Path,
    output: &Path,
    format: Option<OutputFormat>,
    preview: Option<&Path>,
    sheet_path: Option<&Path>,
    border: Option<Option<u32>>,
    json: bool,
) -> Result<()> {
    let target = &cfg.calibration;
    let img = upload::load_upload(input, cfg.upload.max_bytes)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let thresholds = Thresholds {
        score: cfg.models.score_threshold,
        nms: cfg.models.nms_threshold,
        face: cfg.models.face_threshold,
    };
    let mut pipeline =
        FaceMeshPipeline::new(&cfg.models.detector, &cfg.models.landmarks, thresholds)
            .context("Failed to initialize face landmark pipeline")?;

    info!("Processing...");
    let processed = photo::process(&img, &mut pipeline, target)?;

    let (output, format) = output_target(output, format);
    export::save(processed.image(), &output, format, target.dpi)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if let Some(path) = preview {
        let (path, format) = output_target(path, None);
        let renderer = OverlayRenderer::with_font_candidates(&cfg.overlay.fonts);
        match photo::preview(&processed, &mut pipeline, &renderer, cfg.overlay.landmarks, target)? {
            Some(annotated) => {
                export::save(&annotated, &path, format, target.dpi)
                    .with_context(|| format!("Failed to write preview {}", path.display()))?;
            }
            None => {
                warn!("Writing preview without measurement overlay");
                export::save(processed.image(), &path, format, target.dpi)?;
            }
        }
    }

    if let Some(path) = sheet_path {
        let (path, format) = output_target(path, None);
        let layout = &cfg.sheet.layout;
        let print = sheet::compose(processed.image(), layout, border_thickness(cfg, border));
        export::save(&print, &path, format, target.dpi)
            .with_context(|| format!("Failed to write sheet {}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&processed.report())?);
    }

    info!("✓ Passport photo saved to {}", output.display());
    Ok(())
}

fn make_sheet(
    cfg: &config::Config,
    input: &Path,
    output: &Path,
    format: Option<OutputFormat>,
    border: Option<Option<u32>>,
) -> Result<()> {
    let img = upload::load_upload(input, cfg.upload.max_bytes)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let size = cfg.calibration.output_size_px;
    if img.width() != size || img.height() != size {
        warn!(
            "{} is {}x{}, not a {} px calibrated photo; it will be stretched",
            input.display(),
            img.width(),
            img.height(),
            size
        );
    }

    let print = sheet::compose(
        &img.to_rgb8(),
        &cfg.sheet.layout,
        border_thickness(cfg, border),
    );
    let (output, format) = output_target(output, format);
    export::save(&print, &output, format, cfg.calibration.dpi)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("✓ Print sheet saved to {}", output.display());
    Ok(())
}

fn init_config(cfg: &config::Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(config::CONFIG_PATH.as_path());
    if path.exists() {
        anyhow::bail!("Config already exists at {}", path.display());
    }
    config::save_config(cfg, Some(path)).context("Failed to write config")?;
    info!("✓ Default config written to {}", path.display());
    Ok(())
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let config_path = path.unwrap_or(config::CONFIG_PATH.as_path());
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
