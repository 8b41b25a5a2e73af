//! Input validation before decoding.

use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates inputs before processing.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Quick validation of an encoded buffer before full decode.
    ///
    /// Checks:
    /// - Buffer size is within limits
    /// - Buffer starts with valid image magic bytes
    pub fn validate_bytes(&self, bytes: &[u8]) -> Result<(), PipelineError> {
        let max_bytes = self.limits.max_file_size_mb.saturating_mul(1024 * 1024);
        if bytes.len() as u64 > max_bytes {
            return Err(PipelineError::FileTooLarge {
                size_mb: bytes.len() as u64 / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        if bytes.len() < 4 {
            return Err(PipelineError::Decode {
                message: "Buffer too small to be a valid image".to_string(),
            });
        }

        if !is_valid_image_header(&bytes[..bytes.len().min(12)]) {
            return Err(PipelineError::Decode {
                message: "Unrecognized image format (invalid magic bytes)".to_string(),
            });
        }

        Ok(())
    }

    /// Check that a source file exists before it is read.
    pub fn validate_path(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        Ok(())
    }
}

/// Check if the header bytes match known image formats.
fn is_valid_image_header(header: &[u8]) -> bool {
    if header.len() < 4 {
        return false;
    }

    // JPEG: FF D8 FF
    if header[0] == 0xFF && header[1] == 0xD8 && header[2] == 0xFF {
        return true;
    }

    // PNG: 89 50 4E 47
    if header[..4] == [0x89, b'P', b'N', b'G'] {
        return true;
    }

    // GIF: GIF8
    if header[..4] == *b"GIF8" {
        return true;
    }

    // WebP: RIFF....WEBP
    if header[..4] == *b"RIFF" {
        if header.len() >= 12 {
            return header[8..12] == *b"WEBP";
        }
        return true;
    }

    // BMP: BM
    if header[0] == b'B' && header[1] == b'M' {
        return true;
    }

    // TIFF: II (little-endian) or MM (big-endian) followed by version 42
    header[..4] == [b'I', b'I', 0x2A, 0x00] || header[..4] == [b'M', b'M', 0x00, 0x2A]
}
