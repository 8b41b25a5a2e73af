//! Image normalization pipeline components.
//!
//! - **validate**: Size and magic-byte checks before decoding
//! - **decode**: Decode encoded buffers with limits and timeout
//! - **classify**: Decide whether the background is already white
//! - **normalize**: Trim whitespace, pad to a square, re-encode as JPEG
//! - **processor**: Orchestrates the full pipeline for one image
//! - **batch**: Reprocesses many images concurrently
//! - **discovery**: Find image files in directories
//! - **hash**: Content hashes for skip-existing checks

pub mod batch;
pub mod classify;
pub mod decode;
pub mod discovery;
pub mod hash;
pub mod normalize;
pub mod processor;
pub mod validate;

// Re-exports for convenient access
pub use batch::{BatchItem, BatchOutcome, BatchProcessor, BatchSource};
pub use classify::BackgroundClassifier;
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use hash::Hasher;
pub use normalize::{target_size, NormalizeOutcome, WhitespaceNormalizer};
pub use processor::{ImageProcessor, ProcessOptions};
pub use validate::Validator;
