//! Core data types for the Specimen normalization pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The longer of the two sides.
    pub fn max_side(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The classifier's verdict on whether an image already sits on white.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundAssessment {
    /// True when the sampled perimeter is mostly near-white
    pub is_white: bool,

    /// Fraction of sampled pixels that were near-white (0.0 to 1.0)
    pub white_ratio: f64,

    /// Number of perimeter pixels inspected
    pub sampled_pixels: u32,

    /// Number of inspected pixels that were near-white
    pub white_pixels: u32,
}

impl BackgroundAssessment {
    /// The conservative verdict used whenever the image can't be inspected.
    ///
    /// Reporting "not white" means the pipeline will attempt background removal.
    pub fn not_white() -> Self {
        Self {
            is_white: false,
            white_ratio: 0.0,
            sampled_pixels: 0,
            white_pixels: 0,
        }
    }
}

/// Terminal output of one pipeline run.
///
/// `buffer` is always a decodable, square JPEG.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// Normalized JPEG bytes
    pub buffer: Vec<u8>,

    /// Whether the background-removal service replaced the background
    pub was_background_removed: bool,

    /// Classifier verdict on the raw input
    pub assessment: BackgroundAssessment,

    /// Dimensions of the raw input
    pub original: Dimensions,

    /// Dimensions of the subject's bounding box after trimming
    pub trimmed: Dimensions,

    /// Dimensions of the square output canvas
    pub output: Dimensions,
}

/// A per-image record emitted by the CLI after processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedImage {
    // === Source Identification ===
    /// Path of the source image
    pub source_path: PathBuf,

    /// BLAKE3 hash of the source bytes
    pub source_hash: String,

    // === Geometry ===
    /// Raw input dimensions
    pub original: Dimensions,

    /// Subject bounding box after trimming
    pub trimmed: Dimensions,

    /// Square output dimensions
    pub output: Dimensions,

    // === Background ===
    /// Fraction of sampled perimeter pixels that were near-white
    pub white_ratio: f64,

    /// Whether the background was replaced by the removal service
    pub was_background_removed: bool,

    // === Output ===
    /// Where the normalized JPEG was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Size of the normalized JPEG in bytes
    pub output_size: u64,
}

impl ProcessedImage {
    /// Build a record from a pipeline result.
    pub fn from_result(
        source_path: PathBuf,
        source_hash: String,
        result: &ProcessingResult,
        output_path: Option<PathBuf>,
    ) -> Self {
        Self {
            source_path,
            source_hash,
            original: result.original,
            trimmed: result.trimmed,
            output: result.output,
            white_ratio: result.assessment.white_ratio,
            was_background_removed: result.was_background_removed,
            output_path,
            output_size: result.buffer.len() as u64,
        }
    }
}

/// Aggregate outcome of a batch reprocessing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Number of items submitted
    pub total: usize,

    /// Items that produced a normalized image
    pub processed: usize,

    /// Items that failed
    pub failed: usize,

    /// One "<id>: <message>" entry per failure
    pub errors: Vec<String>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_helpers() {
        let dims = Dimensions::new(800, 600);
        assert_eq!(dims.max_side(), 800);
        assert!(!dims.is_square());
        assert!(Dimensions::new(960, 960).is_square());
        assert_eq!(dims.to_string(), "800x600");
    }

    #[test]
    fn test_not_white_assessment() {
        let assessment = BackgroundAssessment::not_white();
        assert!(!assessment.is_white);
        assert_eq!(assessment.white_ratio, 0.0);
    }

    #[test]
    fn test_processed_image_serialization_skips_missing_output_path() {
        let result = ProcessingResult {
            buffer: vec![0; 42],
            was_background_removed: true,
            assessment: BackgroundAssessment::not_white(),
            original: Dimensions::new(800, 600),
            trimmed: Dimensions::new(700, 500),
            output: Dimensions::new(840, 840),
        };
        let record =
            ProcessedImage::from_result(PathBuf::from("a.png"), "abc".into(), &result, None);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"was_background_removed\":true"));
        assert!(json.contains("\"output_size\":42"));
        assert!(!json.contains("output_path"));
    }

    #[test]
    fn test_batch_report_default_is_clean() {
        let report = BatchReport::default();
        assert!(report.is_clean());
        assert_eq!(report.total, 0);
    }
}
