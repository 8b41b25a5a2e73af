//! Background classification by perimeter sampling.
//!
//! Photos of print samples are usually taken either on a white studio sweep or
//! on whatever surface was at hand. Sampling only the corners and the top and
//! bottom edges tells the two apart without being fooled by a dark subject in
//! the middle of the frame.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};

use crate::config::ClassifierConfig;
use crate::types::BackgroundAssessment;

use super::decode::decode_bytes;

/// Decides whether an image already sits on an effectively white background.
#[derive(Debug, Clone)]
pub struct BackgroundClassifier {
    config: ClassifierConfig,
}

impl BackgroundClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Assess an encoded image. Never fails: undecodable input is "not white".
    pub fn assess(&self, bytes: &[u8]) -> BackgroundAssessment {
        match decode_bytes(bytes) {
            Ok(decoded) => self.assess_image(&decoded.image),
            Err(e) => {
                tracing::warn!("Background check failed, assuming non-white: {e}");
                BackgroundAssessment::not_white()
            }
        }
    }

    /// Assess an already-decoded image.
    pub fn assess_image(&self, image: &DynamicImage) -> BackgroundAssessment {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return BackgroundAssessment::not_white();
        }

        let size = self.config.sample_size;
        let sample = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();

        let (white_pixels, sampled_pixels) = self.count_perimeter(&sample);
        let white_ratio = if sampled_pixels == 0 {
            0.0
        } else {
            white_pixels as f64 / sampled_pixels as f64
        };
        let is_white = white_ratio > self.config.white_ratio_threshold;

        tracing::debug!(
            "White background check: {:.1}% white pixels ({}/{})",
            white_ratio * 100.0,
            white_pixels,
            sampled_pixels
        );

        BackgroundAssessment {
            is_white,
            white_ratio,
            sampled_pixels,
            white_pixels,
        }
    }

    /// Count near-white pixels over the corner squares and the edge rows.
    ///
    /// Edge rows skip the columns the corner squares already cover, so no
    /// pixel is counted twice in the top or bottom band.
    fn count_perimeter(&self, sample: &RgbImage) -> (u32, u32) {
        let size = sample.width();
        let corner = self.config.corner_size.min(size);
        let far = size - corner;

        let mut white = 0u32;
        let mut total = 0u32;
        let mut visit = |x: u32, y: u32| {
            if self.is_near_white(sample.get_pixel(x, y).0) {
                white += 1;
            }
            total += 1;
        };

        for (cx, cy) in [(0, 0), (far, 0), (0, far), (far, far)] {
            for dy in 0..corner {
                for dx in 0..corner {
                    visit(cx + dx, cy + dy);
                }
            }
        }

        let rows = self.config.edge_rows.min(size / 2);
        let edge_rows = (0..rows).chain(size - rows..size);
        for y in edge_rows {
            for x in corner..far {
                visit(x, y);
            }
        }

        (white, total)
    }

    fn is_near_white(&self, [r, g, b]: [u8; 3]) -> bool {
        let threshold = self.config.near_white_threshold;
        r >= threshold && g >= threshold && b >= threshold
    }
}
