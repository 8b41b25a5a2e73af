//! Specimen Core - image normalization for print-sample photos.
//!
//! Every uploaded photo of a physical print sample goes through the same
//! pipeline so the library grid looks consistent:
//!
//! ```text
//! Bytes → Validate/Decode → Classify background → (Remove background) → Trim + pad → JPEG
//! ```
//!
//! Background removal only runs when the perimeter of the photo isn't already
//! mostly white, and it is best-effort: if the service is missing or fails, the
//! original photo is normalized instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use specimen_core::{Config, ImageProcessor};
//!
//! #[tokio::main]
//! async fn main() -> specimen_core::Result<()> {
//!     let config = Config::load()?;
//!     let processor = ImageProcessor::new(&config);
//!
//!     let raw = std::fs::read("./sample.png")?;
//!     let result = processor.process(raw).await?;
//!     std::fs::write("./sample.jpg", &result.buffer)?;
//!     println!("Background removed: {}", result.was_background_removed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod removal;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, Result, SpecimenError};
pub use output::{read_source_hashes, OutputFormat, ReportRecord, ReportWriter};
pub use pipeline::{
    BackgroundClassifier, BatchItem, BatchOutcome, BatchProcessor, BatchSource, DiscoveredFile,
    FileDiscovery, Hasher, ImageProcessor, NormalizeOutcome, ProcessOptions,
    WhitespaceNormalizer,
};
pub use removal::{BackgroundRemover, RemovalOutcome, RemoveBgRemover, RemoverFactory};
pub use types::{BackgroundAssessment, BatchReport, Dimensions, ProcessedImage, ProcessingResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
