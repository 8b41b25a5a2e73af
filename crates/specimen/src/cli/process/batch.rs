//! Batch processing: directory traversal with progress, skip-existing, and streaming output.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use indicatif::ProgressBar;
use specimen_core::{
    read_source_hashes, BatchItem, BatchOutcome, BatchProcessor, BatchReport, DiscoveredFile,
    Hasher, OutputFormat as CoreOutputFormat, ProcessedImage, ReportRecord,
};

use super::{open_report, output_path_for, write_output, ProcessArgs, ProcessContext, Report};

/// Reprocess a directory of images with progress tracking.
pub async fn process_batch(
    ctx: ProcessContext,
    args: &ProcessArgs,
    files: Vec<DiscoveredFile>,
) -> anyhow::Result<()> {
    let existing_hashes = if args.skip_existing {
        if args.report.is_none() {
            tracing::warn!("--skip-existing has no effect without --report");
        }
        load_existing_hashes(args.report.as_deref())?
    } else {
        HashSet::new()
    };
    if !existing_hashes.is_empty() {
        tracing::info!(
            "Loaded {} existing hashes from report file",
            existing_hashes.len()
        );
    }

    let mut skipped: u64 = 0;
    let mut total_bytes: u64 = 0;
    let mut items = Vec::with_capacity(files.len());
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut collisions = Vec::new();
    for file in files {
        if !existing_hashes.is_empty() {
            if let Ok(hash) = Hasher::file_hash(&file.path) {
                if existing_hashes.contains(&hash) {
                    skipped += 1;
                    continue;
                }
            }
        }
        // swatch.png and swatch.jpg both map to swatch.jpg; the first one keeps it.
        let output_path = output_path_for(&args.input, &file.path, &args.output_dir);
        if let Some(owner) = claimed.get(&output_path) {
            tracing::warn!("{:?} collides with {:?}, skipping", file.path, owner);
            collisions.push(format!(
                "{}: output {} already claimed by {}",
                file.path.display(),
                output_path.display(),
                owner.display()
            ));
            continue;
        }
        claimed.insert(output_path, file.path.clone());

        total_bytes += file.size;
        items.push(BatchItem::from_file(
            file.path.display().to_string(),
            file.path,
        ));
    }

    let report = open_run_report(&ctx, args)?;

    let start_time = Instant::now();
    let progress = create_progress_bar(items.len() as u64)?;
    let report = Arc::new(Mutex::new(Some(report)));
    let sink = OutputSink {
        input_root: args.input.clone(),
        output_dir: args.output_dir.clone(),
        report: report.clone(),
        progress: progress.clone(),
        start_time,
    };

    let batch = BatchProcessor::new(
        ctx.processor.clone(),
        ctx.config.batch.parallel_workers,
        ctx.options.clone(),
    );
    let mut summary = batch.run(items, move |outcome| sink.accept(outcome)).await;
    progress.finish_and_clear();
    summary.total += collisions.len();
    summary.failed += collisions.len();
    summary.errors.extend(collisions);

    let mut report = report
        .lock()
        .map_err(|_| anyhow::anyhow!("report writer lock poisoned"))?
        .take()
        .context("report writer already closed")?;
    report.write(ReportRecord::Summary(summary.clone()))?;
    report.finish()?;
    if let Some(ref path) = args.report {
        tracing::info!("Report written to {:?}", path);
    }

    print_summary(&summary, skipped, total_bytes, start_time.elapsed());

    if !summary.is_clean() {
        anyhow::bail!(
            "{} of {} image(s) failed to normalize",
            summary.failed,
            summary.total
        );
    }
    Ok(())
}

/// Receives each batch outcome: stores the JPEG and records it in the report.
struct OutputSink {
    input_root: PathBuf,
    output_dir: PathBuf,
    report: Arc<Mutex<Option<Report>>>,
    progress: ProgressBar,
    start_time: Instant,
}

impl OutputSink {
    fn accept(&self, outcome: BatchOutcome) -> Result<(), String> {
        self.tick();

        let BatchOutcome::Success {
            id,
            source_hash,
            result,
        } = outcome
        else {
            return Ok(());
        };

        let source = PathBuf::from(id);
        let output_path = output_path_for(&self.input_root, &source, &self.output_dir);
        write_output(&output_path, &result.buffer)
            .map_err(|e| format!("Failed to write {}: {e}", output_path.display()))?;

        let record = ProcessedImage::from_result(source, source_hash, &result, Some(output_path));
        let mut guard = self
            .report
            .lock()
            .map_err(|_| "report writer lock poisoned".to_string())?;
        if let Some(report) = guard.as_mut() {
            report
                .write(ReportRecord::Image(record))
                .map_err(|e| format!("Failed to write report record: {e}"))?;
        }
        Ok(())
    }

    fn tick(&self) {
        self.progress.inc(1);
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = self.progress.position() as f64 / elapsed;
            self.progress.set_message(format!("{:.1} img/sec", rate));
        }
    }
}

/// Load source hashes from an existing report for --skip-existing.
pub(crate) fn load_existing_hashes(report: Option<&Path>) -> anyhow::Result<HashSet<String>> {
    let Some(path) = report else {
        return Ok(HashSet::new());
    };
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let file = std::fs::File::open(path)?;
    read_source_hashes(file).with_context(|| format!("Failed to read report {:?}", path))
}

/// Open the report for this run.
///
/// With --skip-existing a JSONL report is appended to. A JSON array can't be
/// appended to, so it is rewritten with its earlier image records replayed first.
pub(crate) fn open_run_report(ctx: &ProcessContext, args: &ProcessArgs) -> anyhow::Result<Report> {
    let carried = if args.skip_existing && ctx.report_format == CoreOutputFormat::Json {
        load_existing_images(args.report.as_deref())
    } else {
        Vec::new()
    };
    let append = args.skip_existing && ctx.report_format == CoreOutputFormat::JsonLines;
    let pretty = ctx.pretty || args.report.is_none();

    let mut report = open_report(args.report.as_deref(), ctx.report_format, pretty, append)?;
    for image in carried {
        report.write(ReportRecord::Image(image))?;
    }
    Ok(report)
}

/// Image records from an existing JSON array report.
fn load_existing_images(report: Option<&Path>) -> Vec<ProcessedImage> {
    let Some(path) = report.filter(|p| p.exists()) else {
        return Vec::new();
    };
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| {
            serde_json::from_str::<Vec<ReportRecord>>(&content).map_err(|e| e.to_string())
        });

    match parsed {
        Ok(records) => records
            .into_iter()
            .filter_map(|record| match record {
                ReportRecord::Image(image) => Some(image),
                ReportRecord::Summary(_) => None,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(
                "--skip-existing: failed to parse existing JSON report at {:?} ({e}) - \
                 existing records will not be merged",
                path
            );
            Vec::new()
        }
    }
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> anyhow::Result<ProgressBar> {
    use indicatif::ProgressStyle;

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )?
            .progress_chars("##-"),
    );
    pb.set_message("starting...");
    Ok(pb)
}

/// Print a formatted summary table after batch processing.
fn print_summary(summary: &BatchReport, skipped: u64, total_bytes: u64, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    let (rate, throughput) = if secs > 0.0 {
        (
            summary.processed as f64 / secs,
            total_bytes as f64 / 1_000_000.0 / secs,
        )
    } else {
        (0.0, 0.0)
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Normalized:   {:>8}", summary.processed);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    if skipped > 0 {
        eprintln!("    Skipped:      {:>8}", skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.total as u64 + skipped);
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("    Throughput:   {:>7.1} MB/sec", throughput);
    eprintln!("  ====================================");
    for error in &summary.errors {
        eprintln!("    ✗ {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use specimen_core::{Config, ImageProcessor, ProcessOptions};

    fn write_png(path: &Path, width: u32, height: u32) {
        let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for y in height / 4..height * 3 / 4 {
            for x in width / 4..width * 3 / 4 {
                img.put_pixel(x, y, Rgb([30, 30, 30]));
            }
        }
        DynamicImage::ImageRgb8(img)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    fn context(format: CoreOutputFormat) -> ProcessContext {
        let config = Config::default();
        ProcessContext {
            processor: Arc::new(ImageProcessor::with_remover(&config, None)),
            options: ProcessOptions::default(),
            report_format: format,
            pretty: false,
            config,
        }
    }

    fn report_lines(path: &Path) -> Vec<ReportRecord> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_load_existing_hashes_without_report() {
        assert!(load_existing_hashes(None).unwrap().is_empty());
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.jsonl");
        assert!(load_existing_hashes(Some(&missing)).unwrap().is_empty());
    }

    #[test]
    fn test_load_existing_images_ignores_unparseable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, "[not json").unwrap();
        assert!(load_existing_images(Some(&path)).is_empty());
    }

    #[tokio::test]
    async fn test_batch_writes_mirrored_outputs_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("uploads");
        std::fs::create_dir_all(input.join("linen")).unwrap();
        write_png(&input.join("a.png"), 200, 100);
        write_png(&input.join("linen/b.png"), 80, 160);

        let files = vec![
            DiscoveredFile {
                path: input.join("a.png"),
                size: 1,
            },
            DiscoveredFile {
                path: input.join("linen/b.png"),
                size: 1,
            },
        ];
        let args = ProcessArgs {
            input: input.clone(),
            output_dir: dir.path().join("out"),
            report: Some(dir.path().join("report.jsonl")),
            ..ProcessArgs::default()
        };

        process_batch(context(CoreOutputFormat::JsonLines), &args, files)
            .await
            .unwrap();

        assert!(dir.path().join("out/a.jpg").exists());
        assert!(dir.path().join("out/linen/b.jpg").exists());

        let records = report_lines(&dir.path().join("report.jsonl"));
        assert_eq!(records.len(), 3);
        match records.last().unwrap() {
            ReportRecord::Summary(summary) => {
                assert_eq!(summary.processed, 2);
                assert!(summary.is_clean());
            }
            other => panic!("expected summary last, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_fails_when_an_item_fails() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("bad.png");
        write_png(&good, 50, 50);
        std::fs::write(&bad, b"\x89PNG\r\n\x1a\nbroken").unwrap();

        let files = vec![
            DiscoveredFile { path: bad, size: 16 },
            DiscoveredFile {
                path: good,
                size: 1,
            },
        ];
        let args = ProcessArgs {
            input: dir.path().to_path_buf(),
            output_dir: dir.path().join("out"),
            report: Some(dir.path().join("report.jsonl")),
            ..ProcessArgs::default()
        };

        let err = process_batch(context(CoreOutputFormat::JsonLines), &args, files)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
        assert!(dir.path().join("out/good.jpg").exists());
    }

    #[tokio::test]
    async fn test_skip_existing_appends_only_new_images() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.png");
        let second = dir.path().join("second.png");
        write_png(&first, 64, 64);
        write_png(&second, 90, 30);
        let report_path = dir.path().join("report.jsonl");

        let args = ProcessArgs {
            input: dir.path().to_path_buf(),
            output_dir: dir.path().join("out"),
            report: Some(report_path.clone()),
            skip_existing: true,
            ..ProcessArgs::default()
        };
        let discovered = |paths: &[&Path]| -> Vec<DiscoveredFile> {
            paths
                .iter()
                .map(|p| DiscoveredFile {
                    path: p.to_path_buf(),
                    size: 1,
                })
                .collect()
        };

        process_batch(
            context(CoreOutputFormat::JsonLines),
            &args,
            discovered(&[&first]),
        )
        .await
        .unwrap();
        process_batch(
            context(CoreOutputFormat::JsonLines),
            &args,
            discovered(&[&first, &second]),
        )
        .await
        .unwrap();

        let images: Vec<ProcessedImage> = report_lines(&report_path)
            .into_iter()
            .filter_map(|r| match r {
                ReportRecord::Image(image) => Some(image),
                ReportRecord::Summary(_) => None,
            })
            .collect();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].source_path, first);
        assert_eq!(images[1].source_path, second);
    }

    #[tokio::test]
    async fn test_colliding_outputs_fail_instead_of_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("swatch.png");
        let jpg = dir.path().join("swatch.jpg");
        write_png(&png, 60, 60);
        write_png(&jpg, 120, 40);
        let report_path = dir.path().join("report.jsonl");

        let files = vec![
            DiscoveredFile {
                path: png.clone(),
                size: 1,
            },
            DiscoveredFile {
                path: jpg.clone(),
                size: 1,
            },
        ];
        let args = ProcessArgs {
            input: dir.path().to_path_buf(),
            output_dir: dir.path().join("out"),
            report: Some(report_path.clone()),
            ..ProcessArgs::default()
        };

        let err = process_batch(context(CoreOutputFormat::JsonLines), &args, files)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 of 2"));

        let records = report_lines(&report_path);
        let images: Vec<&ProcessedImage> = records
            .iter()
            .filter_map(|r| match r {
                ReportRecord::Image(image) => Some(image),
                ReportRecord::Summary(_) => None,
            })
            .collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].source_path, png);

        match records.last().unwrap() {
            ReportRecord::Summary(summary) => {
                assert_eq!(summary.total, 2);
                assert_eq!(summary.processed, 1);
                assert_eq!(summary.failed, 1);
                assert!(summary.errors[0].contains("already claimed"));
            }
            other => panic!("expected summary last, got {other:?}"),
        }

        // The surviving output is the 60x60 PNG's square, not the 120x40 one's.
        let out = image::open(dir.path().join("out/swatch.jpg")).unwrap();
        assert_eq!(out.width(), 36);
    }
}
