//! Batch reprocessing of many stored images.
//!
//! Every item is processed independently in its own task, bounded by a
//! semaphore. One item failing never stops the others; failures are counted
//! and reported as "<id>: <message>" strings alongside the successes.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::PipelineError;
use crate::types::{BatchReport, ProcessingResult};

use super::hash::Hasher;
use super::processor::{ImageProcessor, ProcessOptions};

/// Where a batch item's encoded bytes come from.
#[derive(Debug, Clone)]
pub enum BatchSource {
    /// Bytes already in memory
    Bytes(Vec<u8>),
    /// A file read only once the item gets a worker slot
    File(PathBuf),
}

/// One image submitted for batch processing.
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Caller-chosen identifier used in reports (a sample id, a file path)
    pub id: String,
    /// Encoded source
    pub source: BatchSource,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            source: BatchSource::Bytes(bytes),
        }
    }

    pub fn from_file(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            source: BatchSource::File(path.into()),
        }
    }

    async fn load(self) -> Result<(String, Vec<u8>), (String, String)> {
        match self.source {
            BatchSource::Bytes(bytes) => Ok((self.id, bytes)),
            BatchSource::File(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => Ok((self.id, bytes)),
                Err(e) => Err((self.id, format!("Failed to read image: {e}"))),
            },
        }
    }
}

/// Result of processing a single batch item.
#[derive(Debug)]
pub enum BatchOutcome {
    Success {
        id: String,
        /// BLAKE3 hash of the source bytes
        source_hash: String,
        result: ProcessingResult,
    },
    Failure {
        id: String,
        error: String,
    },
}

impl BatchOutcome {
    /// The identifier of the item this outcome belongs to.
    pub fn id(&self) -> &str {
        match self {
            Self::Success { id, .. } | Self::Failure { id, .. } => id,
        }
    }
}

/// Concurrent batch runner over a shared [`ImageProcessor`].
pub struct BatchProcessor {
    processor: Arc<ImageProcessor>,
    parallel: usize,
    options: ProcessOptions,
}

impl BatchProcessor {
    pub fn new(processor: Arc<ImageProcessor>, parallel: usize, options: ProcessOptions) -> Self {
        Self {
            processor,
            parallel: parallel.max(1),
            options,
        }
    }

    /// Process a batch, calling `on_result` as each item completes.
    ///
    /// Completion order is unspecified. The callback may itself fail an item
    /// (e.g. when the normalized bytes can't be stored) by returning an error;
    /// that item is then counted as failed.
    pub async fn run<F>(&self, items: Vec<BatchItem>, on_result: F) -> BatchReport
    where
        F: Fn(BatchOutcome) -> Result<(), String> + Send + Sync + 'static,
    {
        let total = items.len();
        tracing::info!("Starting reprocessing of {} images...", total);

        let semaphore = Arc::new(Semaphore::new(self.parallel));
        let on_result = Arc::new(on_result);
        let mut handles = Vec::with_capacity(total);

        for item in items {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                tracing::warn!("Batch semaphore closed unexpectedly, stopping batch");
                break;
            };

            let processor = self.processor.clone();
            let options = self.options.clone();
            let on_result = on_result.clone();

            let handle = tokio::spawn(async move {
                let outcome = match item.load().await {
                    Ok((id, bytes)) => {
                        tracing::debug!("Processing {id}...");
                        let source_hash = Hasher::content_hash(&bytes);
                        match processor.process_with_options(bytes, &options).await {
                            Ok(result) => BatchOutcome::Success {
                                id,
                                source_hash,
                                result,
                            },
                            Err(e) => BatchOutcome::Failure {
                                id,
                                error: e.to_string(),
                            },
                        }
                    }
                    Err((id, error)) => BatchOutcome::Failure { id, error },
                };
                drop(permit);

                let id = outcome.id().to_string();
                let failure = match &outcome {
                    BatchOutcome::Success { .. } => None,
                    BatchOutcome::Failure { error, .. } => Some(error.clone()),
                };
                match (failure, on_result(outcome)) {
                    (None, Ok(())) => Ok(()),
                    (Some(error), _) | (None, Err(error)) => Err(format!("{id}: {error}")),
                }
            });
            handles.push(handle);
        }

        let mut report = BatchReport {
            total,
            ..BatchReport::default()
        };
        let submitted = handles.len();

        for handle in handles {
            match handle.await {
                Ok(Ok(())) => report.processed += 1,
                Ok(Err(message)) => {
                    tracing::error!("✗ {message}");
                    report.failed += 1;
                    report.errors.push(message);
                }
                Err(e) => {
                    let message = PipelineError::Unprocessable {
                        message: format!("batch task panicked: {e}"),
                    }
                    .to_string();
                    tracing::error!("✗ {message}");
                    report.failed += 1;
                    report.errors.push(message);
                }
            }
        }

        // Items never submitted because the batch stopped early
        let skipped = total - submitted;
        report.failed += skipped;

        tracing::info!(
            "Reprocessing complete: {} processed, {} failed",
            report.processed,
            report.failed
        );
        report
    }
}
