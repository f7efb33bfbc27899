use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pixel brightness sum (r + g + b) above which a pixel is treated as
/// background. 600 keys out white and light-gray backdrops while leaving
/// midtones alone.
pub const DEFAULT_BRIGHTNESS_THRESHOLD: u16 = 600;

/// Maximum meaningful brightness sum for an 8-bit RGB pixel.
pub const MAX_BRIGHTNESS: u16 = 765;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    /// Punch transparency into bright background pixels.
    Keyout,
    /// Composite over an opaque backdrop, discarding the alpha channel.
    Flatten,
}

impl TransformMode {
    /// Parses the `mode` form field. Unknown values are rejected rather than
    /// silently defaulted so a typo doesn't return the wrong artifact.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keyout" => Some(TransformMode::Keyout),
            "flatten" => Some(TransformMode::Flatten),
            _ => None,
        }
    }
}

/// Caller-tunable knobs for a single conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerOptions {
    pub mode: TransformMode,
    /// Only meaningful for `Keyout`; clamped to `0..=MAX_BRIGHTNESS`.
    pub threshold: u16,
    /// Paint a white rim around the opaque silhouette after keyout.
    pub outline: bool,
    /// Explicit outline radius in pixels; `None` derives one from the image
    /// dimensions.
    pub outline_radius: Option<u32>,
}

impl Default for StickerOptions {
    fn default() -> Self {
        StickerOptions {
            mode: TransformMode::Keyout,
            threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
            outline: false,
            outline_radius: None,
        }
    }
}

impl StickerOptions {
    pub fn with_threshold(mut self, threshold: u16) -> Self {
        self.threshold = threshold.min(MAX_BRIGHTNESS);
        self
    }
}

/// One upload/convert/respond cycle, tracked for logging and file naming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StickerJob {
    pub id: String,
    pub original_filename: Option<String>,
    pub upload_size: usize,
    pub options: StickerOptions,
    pub created_at: DateTime<Utc>,
}

impl StickerJob {
    pub fn new(
        original_filename: Option<String>,
        upload_size: usize,
        options: StickerOptions,
    ) -> Self {
        StickerJob {
            id: Uuid::new_v4().to_string(),
            original_filename,
            upload_size,
            options,
            created_at: Utc::now(),
        }
    }
}
