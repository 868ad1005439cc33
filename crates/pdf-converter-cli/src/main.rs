//! PDF Converter CLI - Convert files named on the command line to PDF.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_converter_core::{
    AppConfig, BatchConverter, BatchManifest, BatchOutcome, ConversionStatus, Converter, Error,
    UploadedFile,
};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pdf-convert")]
#[command(author, version, about = "Convert images, text and office documents to PDF", long_about = None)]
struct Args {
    /// Input files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Directory for the generated PDFs and archive
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Never start the headless browser
    #[arg(long)]
    no_renderer: bool,

    /// Archive name prefix (default from config)
    #[arg(long)]
    archive_prefix: Option<String>,

    /// Declared MIME type for every input instead of guessing from the extension
    #[arg(long)]
    mime: Option<String>,

    /// Print the batch manifest as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Read every input into an in-memory upload.
async fn read_inputs(files: &[PathBuf], mime: Option<&str>) -> Result<Vec<UploadedFile>> {
    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let mime = mime.map_or_else(
            || mime_guess::from_path(path).first_or_octet_stream().to_string(),
            ToString::to_string,
        );
        info!("{} ({}, {} bytes)", name, mime, bytes.len());
        uploads.push(UploadedFile::in_memory(name, mime, bytes));
    }
    Ok(uploads)
}

// CLI output is intentional
#[allow(clippy::print_stdout)]
fn print_summary(manifest: &BatchManifest, output_dir: &Path) {
    for result in &manifest.results {
        match (&result.status, &result.pdf_name, &result.error) {
            (ConversionStatus::Success, Some(pdf), _) => {
                println!("  ok    {} -> {}", result.original_filename, pdf);
            }
            (_, pdf, error) => {
                println!(
                    "  error {}: {}",
                    result.original_filename,
                    error.as_deref().unwrap_or("unknown error")
                );
                if let Some(pdf) = pdf {
                    println!("        explanation written to {pdf}");
                }
            }
        }
    }
    println!("{}", manifest.message);
    if let Some(archive) = &manifest.archive_name {
        println!("Archive: {}", output_dir.join(archive).display());
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging; stdout is reserved for the summary
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    if args.no_renderer {
        config.renderer.enabled = false;
    }
    let prefix = args
        .archive_prefix
        .clone()
        .unwrap_or_else(|| config.archive.prefix.clone());

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    let scratch = tempfile::Builder::new()
        .prefix("pdf-convert-")
        .tempdir()
        .context("Failed to create scratch directory")?;

    let uploads = read_inputs(&args.files, args.mime.as_deref()).await?;

    let batch = BatchConverter::new(
        Arc::new(Converter::new(&config)),
        &args.output_dir,
        scratch.path(),
    )
    .with_archive_prefix(prefix);

    let spinner = if args.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]").unwrap());
    spinner.set_message(format!("Converting {} file(s)", uploads.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = batch.convert_batch(uploads).await;
    spinner.finish_and_clear();

    let manifest = match outcome {
        Ok(manifest) => manifest,
        Err(Error::Packaging { reason, results }) => {
            let mut manifest = BatchManifest::new(results, None);
            manifest.success = false;
            manifest.message = format!("Files were converted but the archive could not be created: {reason}");
            manifest
        }
        Err(e) => return Err(e).context("Batch conversion failed"),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&manifest)?;
        // CLI output is intentional
        #[allow(clippy::print_stdout)]
        {
            println!("{json}");
        }
    } else {
        print_summary(&manifest, &args.output_dir);
    }

    let code = match manifest.outcome() {
        BatchOutcome::Complete if manifest.archive_name.is_some() => ExitCode::SUCCESS,
        BatchOutcome::Complete | BatchOutcome::Partial => ExitCode::from(2),
        BatchOutcome::Failed => ExitCode::FAILURE,
    };
    Ok(code)
}
