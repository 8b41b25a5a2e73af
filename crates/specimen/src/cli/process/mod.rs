//! The `specimen process` command for normalizing images.

mod batch;
mod setup;
pub mod types;

pub use types::OutputFormat;

use clap::Args;
use specimen_core::{
    Config, FileDiscovery, Hasher, ImageProcessor, OutputFormat as CoreOutputFormat,
    ProcessOptions, ProcessedImage, ReportRecord, ReportWriter,
};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use batch::{load_existing_hashes, open_run_report, process_batch};
use setup::setup_processor;

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Image file or directory to process
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory for the normalized JPEGs (mirrors the input layout)
    #[arg(short, long, default_value = "normalized")]
    pub output_dir: PathBuf,

    /// Report file (defaults to stdout)
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Report format [default: from config, jsonl]
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of parallel workers [default: from config, 4]
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Never call the background-removal service
    #[arg(long)]
    pub no_removal: bool,

    /// Skip images whose hash already appears in the report file
    #[arg(long)]
    pub skip_existing: bool,

    /// remove.bg API key (overrides the configured key)
    #[arg(long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Manual Default impl for constructing ProcessArgs outside of clap.
///
/// Values match the clap annotations above.
impl Default for ProcessArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_dir: PathBuf::from("normalized"),
            report: None,
            format: None,
            parallel: None,
            no_removal: false,
            skip_existing: false,
            api_key: None,
        }
    }
}

/// Processing context assembled by setup_processor().
pub(crate) struct ProcessContext {
    pub processor: Arc<ImageProcessor>,
    pub options: ProcessOptions,
    pub report_format: CoreOutputFormat,
    pub pretty: bool,
    pub config: Config,
}

/// A report writer over stdout or a file.
pub(crate) type Report = ReportWriter<Box<dyn Write + Send>>;

/// Execute the process command.
pub async fn execute(args: ProcessArgs) -> anyhow::Result<()> {
    let ctx = setup_processor(&args)?;

    let files = FileDiscovery::new(ctx.config.batch.clone()).discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!(
        "Found {} image(s) to process ({:.1} MB)",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / 1_000_000.0
    );

    if args.input.is_file() {
        process_single(ctx, &args).await
    } else {
        process_batch(ctx, &args, files).await
    }
}

// ── Single-file processing ─────────────────────────────────────────────────

/// Normalize a single image file and emit its record.
async fn process_single(ctx: ProcessContext, args: &ProcessArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.input)?;
    let source_hash = Hasher::content_hash(&bytes);

    if args.skip_existing && load_existing_hashes(args.report.as_deref())?.contains(&source_hash)
    {
        tracing::info!("{:?} already processed, skipping", args.input);
        return Ok(());
    }

    let result = ctx
        .processor
        .process_with_options(bytes, &ctx.options)
        .await?;

    let output_path = output_path_for(&args.input, &args.input, &args.output_dir);
    write_output(&output_path, &result.buffer)?;
    tracing::info!(
        "{:?} -> {:?} ({}, background removed: {})",
        args.input,
        output_path,
        result.output,
        result.was_background_removed
    );

    let record = ProcessedImage::from_result(
        args.input.clone(),
        source_hash,
        &result,
        Some(output_path),
    );
    let mut report = open_run_report(&ctx, args)?;
    report.write(ReportRecord::Image(record))?;
    report.finish()?;

    if let Some(ref path) = args.report {
        tracing::info!("Report written to {:?}", path);
    }
    Ok(())
}

// ── Output helpers ─────────────────────────────────────────────────────────

/// Where the normalized JPEG for `source` goes.
///
/// The path relative to `input_root` is mirrored under `output_dir` with a
/// `.jpg` extension. A single-file input maps to `output_dir/<stem>.jpg`.
pub(crate) fn output_path_for(input_root: &Path, source: &Path, output_dir: &Path) -> PathBuf {
    let relative = match source.strip_prefix(input_root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => source
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("image")),
    };
    output_dir.join(relative).with_extension("jpg")
}

/// Write normalized bytes, creating parent directories as needed.
pub(crate) fn write_output(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

/// Open the report destination: the given file, or stdout.
///
/// With `append`, an existing file is extended instead of truncated.
pub(crate) fn open_report(
    path: Option<&Path>,
    format: CoreOutputFormat,
    pretty: bool,
    append: bool,
) -> io::Result<Report> {
    let sink: Box<dyn Write + Send> = match path {
        None => Box::new(io::stdout()),
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = if append && path.exists() {
                OpenOptions::new().append(true).open(path)?
            } else {
                File::create(path)?
            };
            Box::new(BufWriter::new(file))
        }
    };
    Ok(ReportWriter::new(sink, format, pretty))
}
