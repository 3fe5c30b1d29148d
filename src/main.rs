//! contrast-crop CLI: enhance and crop every image of a directory.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use contrast_crop::{BatchConfig, BatchReport, ExtensionFilter, run_batch};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Parser)]
#[command(name = "contrast-crop")]
#[command(
    about = "Enhance contrast (CLAHE + bilateral) and crop each image to its dominant foreground object"
)]
#[command(version)]
struct Cli {
    /// Directory containing the input images.
    input_dir: PathBuf,

    /// Directory to write the crops to (created when missing).
    output_dir: PathBuf,

    /// Only process files with this extension; repeat for several (default: any image format).
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Also write the enhanced image and the annotated mask of every file here.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Stop at the first file that cannot be processed.
    #[arg(long)]
    fail_fast: bool,

    /// Path to write the per-file report (JSON).
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn to_config(&self) -> BatchConfig {
        let mut config = BatchConfig::new(&self.input_dir, &self.output_dir);
        config.filter = ExtensionFilter::from_extensions(&self.extensions);
        config.debug_dir.clone_from(&self.debug_dir);
        config.fail_fast = self.fail_fast;
        config
    }
}

fn main() -> CliResult<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let report = run_batch(&cli.to_config())?;

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
        tracing::info!("Report written to {}", path.display());
    }

    if report.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!("{} file(s) could not be processed", report.failed.len());
        Ok(ExitCode::FAILURE)
    }
}

fn write_report(report: &BatchReport, path: &Path) -> CliResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}
