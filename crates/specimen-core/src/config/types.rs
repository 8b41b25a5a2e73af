//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Resource limits applied at the pipeline's entry gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum encoded input size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            max_image_dimension: 12000,
            decode_timeout_ms: 10000,
        }
    }
}

/// Background classifier settings.
///
/// The classifier downsamples to a `sample_size` square and inspects only the
/// perimeter: four `corner_size` squares plus `edge_rows` rows at the top and
/// bottom.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Side of the downsampled sample grid in pixels
    pub sample_size: u32,

    /// Side of each sampled corner square
    pub corner_size: u32,

    /// Number of rows sampled at the top and at the bottom
    pub edge_rows: u32,

    /// Minimum value of every RGB channel for a pixel to count as near-white
    pub near_white_threshold: u8,

    /// White ratio that must be exceeded for the background to count as white
    pub white_ratio_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sample_size: 100,
            corner_size: 10,
            edge_rows: 3,
            near_white_threshold: 240,
            white_ratio_threshold: 0.85,
        }
    }
}

/// Background-removal service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Whether to call the removal service at all
    pub enabled: bool,

    /// Service endpoint
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Requested output size
    pub size: String,

    /// Color backfilled behind the segmented subject
    pub bg_color: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.remove.bg/v1.0/removebg".to_string(),
            api_key: "${REMOVE_BG_API_KEY}".to_string(),
            size: "auto".to_string(),
            bg_color: "white".to_string(),
            timeout_ms: 30000,
        }
    }
}

/// Whitespace normalizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Per-channel difference from white above which a pixel is subject, not border
    pub trim_threshold: u8,

    /// Margin added on each side, as a fraction of the trimmed longer side
    pub padding_percent: f64,

    /// JPEG quality of the normalized output (1-100)
    pub jpeg_quality: u8,

    /// Contain-resize the subject into the padded canvas, so its longer side
    /// meets the canvas edge. When false the subject keeps its native size and
    /// the margin stays visible.
    pub enlarge: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            trim_threshold: 10,
            padding_percent: 0.10,
            jpeg_quality: 90,
            enlarge: true,
        }
    }
}

/// Batch reprocessing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of images processed concurrently
    pub parallel_workers: usize,

    /// File extensions picked up when walking a directory
    pub supported_formats: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "gif".to_string(),
                "bmp".to_string(),
                "tiff".to_string(),
            ],
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default report format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "jsonl".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
