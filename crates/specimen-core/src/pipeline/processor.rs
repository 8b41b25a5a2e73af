//! Pipeline orchestration - wires the classifier, remover, and normalizer together.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::removal::{remove_background, BackgroundRemover, RemovalOutcome, RemoverFactory};
use crate::types::{BackgroundAssessment, Dimensions, ProcessingResult};

use super::classify::BackgroundClassifier;
use super::decode::{format_to_string, ImageDecoder};
use super::normalize::{NormalizeOutcome, WhitespaceNormalizer};
use super::validate::Validator;

/// Options for controlling a single pipeline run.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Never call the background remover, whatever the classifier says
    pub skip_removal: bool,
}

/// The image processor that runs the full normalization pipeline.
pub struct ImageProcessor {
    validator: Validator,
    decoder: ImageDecoder,
    classifier: BackgroundClassifier,
    remover: Option<Arc<dyn BackgroundRemover>>,
    normalizer: WhitespaceNormalizer,
}

impl ImageProcessor {
    /// Create a processor, building the remover from `config.removal`.
    pub fn new(config: &Config) -> Self {
        Self::with_remover(config, RemoverFactory::create(&config.removal))
    }

    /// Create a processor with an explicit remover (or none).
    pub fn with_remover(config: &Config, remover: Option<Arc<dyn BackgroundRemover>>) -> Self {
        Self {
            validator: Validator::new(config.limits.clone()),
            decoder: ImageDecoder::new(config.limits.clone()),
            classifier: BackgroundClassifier::new(config.classifier.clone()),
            remover,
            normalizer: WhitespaceNormalizer::new(config.normalize.clone()),
        }
    }

    /// Whether a background remover is available.
    pub fn has_remover(&self) -> bool {
        self.remover.is_some()
    }

    /// Process one encoded image through the full pipeline.
    pub async fn process(&self, raw: Vec<u8>) -> PipelineResult<ProcessingResult> {
        self.process_with_options(raw, &ProcessOptions::default())
            .await
    }

    /// Process one encoded image with custom options.
    ///
    /// Only input that can't be decoded at all is an error. A failed or
    /// missing remover leaves the original background in place, and the
    /// result is still a square JPEG.
    pub async fn process_with_options(
        &self,
        raw: Vec<u8>,
        options: &ProcessOptions,
    ) -> PipelineResult<ProcessingResult> {
        let start = std::time::Instant::now();

        // Validate + decode
        self.validator.validate_bytes(&raw)?;
        let decoded = self.decoder.decode_from_bytes(raw.clone()).await?;
        let original = decoded.dimensions();
        tracing::trace!(
            "  Decode: {:?} ({} {}, {} bytes)",
            start.elapsed(),
            format_to_string(decoded.format),
            original,
            decoded.file_size
        );

        // Classify
        let classifier = self.classifier.clone();
        let assessment = tokio::task::spawn_blocking(move || classifier.assess_image(&decoded.image))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Background check task failed: {e}");
                BackgroundAssessment::not_white()
            });
        tracing::debug!("Background is white: {}", assessment.is_white);

        // Remove background
        let removed = if assessment.is_white || options.skip_removal {
            None
        } else {
            let outcome = remove_background(self.remover.as_deref(), &raw).await;
            if matches!(outcome, RemovalOutcome::Failed(_)) {
                tracing::warn!("Background removal failed, proceeding with original image");
            }
            outcome.into_bytes()
        };

        // Normalize
        let result = match removed {
            Some(bytes) => match self.normalize(bytes).await {
                NormalizeOutcome::Normalized {
                    bytes,
                    trimmed,
                    output,
                    ..
                } => Ok((bytes, trimmed, output, true)),
                NormalizeOutcome::Unchanged { reason, .. } => {
                    tracing::warn!(
                        "Background-removed image could not be normalized ({reason}), \
                         falling back to the original"
                    );
                    self.normalize_original(raw).await
                }
            },
            None => self.normalize_original(raw).await,
        };
        let (buffer, trimmed, output, was_background_removed) = result?;

        tracing::debug!(
            "Processed image in {:?} ({} -> {}, background removed: {})",
            start.elapsed(),
            original,
            output,
            was_background_removed
        );

        Ok(ProcessingResult {
            buffer,
            was_background_removed,
            assessment,
            original,
            trimmed,
            output,
        })
    }

    async fn normalize_original(
        &self,
        raw: Vec<u8>,
    ) -> PipelineResult<(Vec<u8>, Dimensions, Dimensions, bool)> {
        match self.normalize(raw).await {
            NormalizeOutcome::Normalized {
                bytes,
                trimmed,
                output,
                ..
            } => Ok((bytes, trimmed, output, false)),
            NormalizeOutcome::Unchanged { reason, .. } => {
                Err(PipelineError::Unprocessable { message: reason })
            }
        }
    }

    async fn normalize(&self, bytes: Vec<u8>) -> NormalizeOutcome {
        let normalizer = self.normalizer.clone();
        match tokio::task::spawn_blocking(move || normalizer.normalize(bytes)).await {
            Ok(outcome) => outcome,
            Err(e) => NormalizeOutcome::Unchanged {
                bytes: Vec::new(),
                reason: format!("Task join error: {e}"),
            },
        }
    }
}
