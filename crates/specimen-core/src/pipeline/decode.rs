//! Image decoding with format detection, limits, and timeout support.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::types::Dimensions;

/// Image decoder with configurable limits and timeout.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Encoded size in bytes
    pub file_size: u64,
}

impl DecodedImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an in-memory buffer off the async runtime, bounded by the decode timeout.
    pub async fn decode_from_bytes(&self, bytes: Vec<u8>) -> Result<DecodedImage, PipelineError> {
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || decode_bytes(&bytes)).await
        })
        .await;

        match decode_result {
            Ok(Ok(Ok(decoded))) => {
                if decoded.width > self.limits.max_image_dimension
                    || decoded.height > self.limits.max_image_dimension
                {
                    return Err(PipelineError::ImageTooLarge {
                        width: decoded.width,
                        height: decoded.height,
                        max_dim: self.limits.max_image_dimension,
                    });
                }
                Ok(decoded)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(PipelineError::Decode {
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                stage: "decode".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }
}

/// Synchronous decode from bytes, detecting the format from content.
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage, PipelineError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode {
            message: format!("Cannot detect image format: {}", e),
        })?;
    let format = reader
        .format()
        .ok_or_else(|| PipelineError::UnsupportedFormat {
            format: "unknown".to_string(),
        })?;
    let image = reader.decode().map_err(|e| PipelineError::Decode {
        message: e.to_string(),
    })?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::Decode {
            message: format!("Image has no pixels ({}x{})", width, height),
        });
    }

    Ok(DecodedImage {
        image,
        format,
        width,
        height,
        file_size: bytes.len() as u64,
    })
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_decode_bytes_detects_format_from_content() {
        let decoded = decode_bytes(&png_bytes(12, 7)).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.dimensions(), Dimensions::new(12, 7));
    }

    #[test]
    fn test_decode_bytes_rejects_garbage() {
        assert!(decode_bytes(b"definitely not an image").is_err());
    }

    #[tokio::test]
    async fn test_decode_enforces_dimension_limit() {
        let decoder = ImageDecoder::new(LimitsConfig {
            max_image_dimension: 10,
            ..LimitsConfig::default()
        });
        let err = decoder.decode_from_bytes(png_bytes(20, 5)).await.err().unwrap();
        assert!(matches!(err, PipelineError::ImageTooLarge { width: 20, .. }));
    }

    #[tokio::test]
    async fn test_decode_from_bytes_ok() {
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let decoded = decoder.decode_from_bytes(png_bytes(4, 4)).await.unwrap();
        assert_eq!(decoded.file_size, png_bytes(4, 4).len() as u64);
    }
}
