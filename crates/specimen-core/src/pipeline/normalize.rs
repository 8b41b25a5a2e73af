//! Whitespace normalization: trim to the subject, pad to a square, re-encode.
//!
//! Every normalized image is a white-backed square JPEG whose canvas is
//! `ceil(longer_side * (1 + 2 * padding_percent))` of the trimmed subject.
//! The subject is contain-resized into that canvas, so only the shorter axis
//! keeps a white band. Each pass starts from a fresh bounding box, which makes
//! repeated passes grow the canvas rather than converge.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use crate::config::NormalizeConfig;
use crate::error::PipelineError;
use crate::types::Dimensions;

use super::decode::decode_bytes;

const WHITE: [u8; 3] = [255, 255, 255];

/// Outcome of a normalization pass.
///
/// Normalization never fails outright: when anything goes wrong the input
/// bytes come back untouched together with the reason.
#[derive(Debug)]
pub enum NormalizeOutcome {
    Normalized {
        bytes: Vec<u8>,
        original: Dimensions,
        trimmed: Dimensions,
        output: Dimensions,
    },
    Unchanged {
        bytes: Vec<u8>,
        reason: String,
    },
}

impl NormalizeOutcome {
    /// The bytes to hand on, whichever way the pass went.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Normalized { bytes, .. } | Self::Unchanged { bytes, .. } => bytes,
        }
    }
}

/// Trims surrounding whitespace and re-pads the subject into a square canvas.
#[derive(Debug, Clone)]
pub struct WhitespaceNormalizer {
    config: NormalizeConfig,
}

impl WhitespaceNormalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    /// Normalize an encoded image, falling back to the input on any error.
    pub fn normalize(&self, bytes: Vec<u8>) -> NormalizeOutcome {
        match self.try_normalize(&bytes) {
            Ok((encoded, original, trimmed, output)) => {
                tracing::debug!("Image normalized: {} -> {}", original, output);
                NormalizeOutcome::Normalized {
                    bytes: encoded,
                    original,
                    trimmed,
                    output,
                }
            }
            Err(e) => {
                tracing::warn!("Normalization failed, keeping input unchanged: {e}");
                NormalizeOutcome::Unchanged {
                    bytes,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_normalize(
        &self,
        bytes: &[u8],
    ) -> Result<(Vec<u8>, Dimensions, Dimensions, Dimensions), PipelineError> {
        let decoded = decode_bytes(bytes)?;
        let original = decoded.dimensions();

        let flattened = flatten_onto_white(&decoded.image);
        let subject = trim(&flattened, self.config.trim_threshold);
        let trimmed = Dimensions::new(subject.width(), subject.height());

        let size = target_size(trimmed.max_side(), self.config.padding_percent);
        let canvas = self.pad_to_square(&subject, size);
        let output = Dimensions::new(canvas.width(), canvas.height());

        let encoded = encode_jpeg(canvas, self.config.jpeg_quality)?;
        Ok((encoded, original, trimmed, output))
    }

    /// Center the subject on a white `size` x `size` canvas without cropping.
    fn pad_to_square(&self, subject: &RgbImage, size: u32) -> RgbImage {
        let (width, height) = subject.dimensions();

        let placed = if self.config.enlarge {
            let scale = size as f64 / width.max(height) as f64;
            let new_width = ((width as f64 * scale).round() as u32).clamp(1, size);
            let new_height = ((height as f64 * scale).round() as u32).clamp(1, size);
            imageops::resize(subject, new_width, new_height, FilterType::Lanczos3)
        } else {
            subject.clone()
        };

        let mut canvas = RgbImage::from_pixel(size, size, Rgb(WHITE));
        let left = (size - placed.width()) / 2;
        let top = (size - placed.height()) / 2;
        imageops::overlay(&mut canvas, &placed, left as i64, top as i64);
        canvas
    }
}

/// Canvas side for a trimmed subject whose longer side is `max_dimension`.
pub fn target_size(max_dimension: u32, padding_percent: f64) -> u32 {
    (max_dimension as f64 * (1.0 + padding_percent * 2.0)).ceil() as u32
}

/// Composite any transparency onto white and drop the alpha channel.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| -> u8 {
            let a = a as u32;
            ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Crop to the bounding box of pixels that differ from white by more than `threshold`.
///
/// An image with no such pixels, or with no white border at all, is returned as is.
fn trim(image: &RgbImage, threshold: u8) -> RgbImage {
    match content_bounds(image, threshold) {
        Some((left, top, right, bottom)) => {
            let view = imageops::crop_imm(image, left, top, right - left + 1, bottom - top + 1);
            view.to_image()
        }
        None => image.clone(),
    }
}

/// Inclusive `(left, top, right, bottom)` of the non-background content.
fn content_bounds(image: &RgbImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;

    for (x, y, pixel) in image.enumerate_pixels() {
        let differs = pixel
            .0
            .iter()
            .zip(WHITE)
            .any(|(&c, w)| c.abs_diff(w) > threshold);
        if !differs {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
        });
    }

    bounds
}

fn encode_jpeg(canvas: RgbImage, quality: u8) -> Result<Vec<u8>, PipelineError> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    DynamicImage::ImageRgb8(canvas)
        .write_with_encoder(encoder)
        .map_err(|e| PipelineError::Encode {
            message: e.to_string(),
        })?;
    Ok(buffer)
}
