//! Configuration types for the workbench.
//!
//! Orchestrator-wide behaviour (upload limits, progress cadence) lives in
//! [`WorkbenchConfig`], built via its [`WorkbenchConfigBuilder`]. Per-job
//! choices the user makes on the options screen are separate value types
//! ([`ImageOptions`], [`SplitMode`], [`PageRangeMode`]) so a single
//! orchestrator can run many differently-configured jobs.

use crate::error::WorkbenchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 50 MiB, the upload limit used when none is configured.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Orchestrator-wide configuration.
///
/// # Example
/// ```rust
/// use pdf_workbench::WorkbenchConfig;
///
/// let config = WorkbenchConfig::builder()
///     .max_upload_bytes(10 * 1024 * 1024)
///     .tick_interval_ms(100)
///     .build()
///     .unwrap();
/// assert_eq!(config.progress_ceiling, 90);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    /// Largest accepted source file in bytes. Default: 50 MiB.
    pub max_upload_bytes: u64,

    /// Accept list for source files: MIME types (`application/pdf`),
    /// MIME wildcards (`image/*`) or extensions (`.pdf`). Empty accepts all.
    pub accepted_types: Vec<String>,

    /// Period of the simulated progress tick in milliseconds. Default: 200.
    pub tick_interval_ms: u64,

    /// Value the simulated progress never exceeds while running. Default: 90.
    pub progress_ceiling: u8,

    /// Largest random increment per tick. Default: 10.
    pub max_tick_step: u8,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_types: vec![".pdf".into(), "application/pdf".into()],
            tick_interval_ms: 200,
            progress_ceiling: 90,
            max_tick_step: 10,
        }
    }
}

impl WorkbenchConfig {
    /// Create a new builder for `WorkbenchConfig`.
    pub fn builder() -> WorkbenchConfigBuilder {
        WorkbenchConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Builder for [`WorkbenchConfig`].
#[derive(Debug)]
pub struct WorkbenchConfigBuilder {
    config: WorkbenchConfig,
}

impl WorkbenchConfigBuilder {
    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn accepted_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.accepted_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.tick_interval_ms = ms;
        self
    }

    pub fn progress_ceiling(mut self, ceiling: u8) -> Self {
        self.config.progress_ceiling = ceiling.min(99);
        self
    }

    pub fn max_tick_step(mut self, step: u8) -> Self {
        self.config.max_tick_step = step;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorkbenchConfig, WorkbenchError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(WorkbenchError::InvalidConfig(
                "max_upload_bytes must be > 0".into(),
            ));
        }
        if c.tick_interval_ms == 0 {
            return Err(WorkbenchError::InvalidConfig(
                "tick_interval_ms must be > 0".into(),
            ));
        }
        if c.max_tick_step == 0 {
            return Err(WorkbenchError::InvalidConfig(
                "max_tick_step must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Per-job options ──────────────────────────────────────────────────────

/// How the user chose pages on the options screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageRangeMode {
    /// Every page (default).
    #[default]
    All,
    /// Free-text range such as `"1-3, 5, 7-9"`.
    Custom(String),
}

/// Target raster format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
    Webp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Output quality preset for lossy formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    High,
    #[default]
    Medium,
    Low,
}

impl QualityPreset {
    /// Encoder quality in `0.0..=1.0`.
    pub fn factor(self) -> f32 {
        match self {
            QualityPreset::High => 0.9,
            QualityPreset::Medium => 0.7,
            QualityPreset::Low => 0.5,
        }
    }

    /// JPEG quality on the 1–100 scale.
    pub fn jpeg_quality(self) -> u8 {
        (self.factor() * 100.0).round() as u8
    }
}

/// Options for the PDF → image job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageOptions {
    pub format: ImageFormat,
    pub quality: QualityPreset,
    /// Render scale relative to the page's natural size. Default: 2.0.
    pub scale: f32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::default(),
            quality: QualityPreset::default(),
            scale: 2.0,
        }
    }
}

/// How the split job packages selected pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// One PDF per selected page (default).
    #[default]
    Multiple,
    /// One PDF holding all selected pages.
    Single,
}

/// What a run of the orchestrator produces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JobRequest {
    /// Render each selected page to an image.
    ToImages(ImageOptions),
    /// Copy selected pages into new PDF documents.
    Split(SplitMode),
}

impl Default for JobRequest {
    fn default() -> Self {
        JobRequest::ToImages(ImageOptions::default())
    }
}

// ── Tool options ─────────────────────────────────────────────────────────

/// Compression strength for [`crate::tools::compress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressOptions {
    pub level: CompressionLevel,
    /// Blank out title, author, subject, keywords, producer and creator.
    pub remove_metadata: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            level: CompressionLevel::Medium,
            remove_metadata: false,
        }
    }
}

/// Paper size for [`crate::tools::images`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
    /// Width and height in millimetres.
    Custom { width_mm: f32, height_mm: f32 },
}

impl PageSize {
    /// Portrait dimensions in millimetres.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Legal => (215.9, 355.6),
            PageSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page geometry for images → PDF.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageLayout {
    pub size: PageSize,
    pub orientation: Orientation,
}

impl PageLayout {
    /// Page size in PDF points (1/72 in), orientation applied.
    pub fn dimensions_pt(&self) -> (f32, f32) {
        const PT_PER_MM: f32 = 72.0 / 25.4;
        let (w, h) = self.size.dimensions_mm();
        let (w, h) = (w * PT_PER_MM, h * PT_PER_MM);
        match self.orientation {
            Orientation::Portrait => (w.min(h), w.max(h)),
            Orientation::Landscape => (w.max(h), w.min(h)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        let built = WorkbenchConfig::builder().build().unwrap();
        assert_eq!(built.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(built.tick_interval_ms, 200);
        assert_eq!(built.progress_ceiling, 90);
    }

    #[test]
    fn builder_rejects_zero_tick() {
        let err = WorkbenchConfig::builder()
            .tick_interval_ms(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("tick_interval_ms"));
    }

    #[test]
    fn ceiling_is_clamped_below_completion() {
        let c = WorkbenchConfig::builder()
            .progress_ceiling(200)
            .build()
            .unwrap();
        assert_eq!(c.progress_ceiling, 99);
    }

    #[test]
    fn quality_presets() {
        assert_eq!(QualityPreset::High.jpeg_quality(), 90);
        assert_eq!(QualityPreset::Medium.jpeg_quality(), 70);
        assert_eq!(QualityPreset::Low.jpeg_quality(), 50);
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let layout = PageLayout {
            size: PageSize::A4,
            orientation: Orientation::Landscape,
        };
        let (w, h) = layout.dimensions_pt();
        assert!(w > h);
        assert!((w - 841.89).abs() < 0.1, "got {w}");
    }
}
