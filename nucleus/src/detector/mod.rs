//! Per-image detection pipeline: segment → clean → label → measure.
//!
//! # Example
//!
//! ```rust,ignore
//! use nucleus::{Config, NucleusDetector};
//!
//! let detector = NucleusDetector::new(Config::default())?;
//! let result = detector.detect(&image)?;
//! println!("{} nuclei", result.nuclei.len());
//! ```


mod batch;
mod error;

pub use batch::{BatchReport, ImageFailure, process_batch, run_batch};
pub use error::ProcessError;

use common::{BitBuffer2, Buffer2};

use crate::config::{Config, ConfigError};
use crate::image::{Image, ImageId};
use crate::labeling::LabelMap;
use crate::measure::{MeasureError, MeasurementExtractor, NucleusRecord};
use crate::morphology::{CleanupStats, MorphologicalCleaner};
use crate::segmentation::{Segmenter, segmenter_from_config};

/// Runs the detection stages configured by one validated [`Config`].
pub struct NucleusDetector {
    config: Config,
    segmenter: Box<dyn Segmenter>,
    cleaner: MorphologicalCleaner,
    extractor: MeasurementExtractor,
}

impl NucleusDetector {
    /// Validate `config` and build the stages it selects.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            segmenter: segmenter_from_config(&config),
            cleaner: MorphologicalCleaner::from_config(&config),
            extractor: MeasurementExtractor::new(config.min_area),
            config,
        })
    }

    /// Replace the configured segmenter.
    pub fn with_segmenter(mut self, segmenter: Box<dyn Segmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn segmenter_name(&self) -> &'static str {
        self.segmenter.name()
    }

    /// Detect nuclei in the plane at `(z_index, channel_index)` of `image`.
    pub fn detect(&self, image: &Image) -> Result<DetectionResult, ProcessError> {
        let plane = image.plane(self.config.z_index, self.config.channel_index)?;
        Ok(self.detect_plane(image.id(), plane)?)
    }

    /// Fails only when a custom segmenter returns a mask whose shape differs
    /// from `plane`.
    pub fn detect_plane(
        &self,
        image_id: &ImageId,
        plane: &Buffer2<f32>,
    ) -> Result<DetectionResult, MeasureError> {
        // Step 1: Foreground mask
        let raw = self.segmenter.segment(plane);
        let foreground_pixels = raw.count_ones();
        tracing::debug!(
            image_id = %image_id,
            segmenter = self.segmenter.name(),
            foreground_pixels,
            "Segmented plane"
        );

        // Step 2: Morphological cleanup
        let (mask, cleanup) = self.cleaner.clean_with_stats(&raw);
        drop(raw);

        // Step 3: Label and measure
        let labels = LabelMap::from_mask(&mask, self.config.connectivity);
        let nuclei = self.extractor.extract(image_id, &labels, plane)?;

        let diagnostics = DetectionDiagnostics {
            segmenter: self.segmenter.name(),
            foreground_pixels,
            cleanup,
            regions: labels.num_labels(),
            nuclei: nuclei.len(),
        };
        tracing::debug!(image_id = %image_id, ?diagnostics, "Detection finished");

        Ok(DetectionResult {
            mask,
            labels,
            nuclei,
            diagnostics,
        })
    }
}

/// Output of one detection pass.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Cleaned foreground mask.
    pub mask: BitBuffer2,
    pub labels: LabelMap,
    /// Measured nuclei ordered by label.
    pub nuclei: Vec<NucleusRecord>,
    pub diagnostics: DetectionDiagnostics,
}

/// Counts from each stage of the pipeline, for tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionDiagnostics {
    pub segmenter: &'static str,
    /// Foreground pixels straight out of the segmenter.
    pub foreground_pixels: usize,
    pub cleanup: CleanupStats,
    /// Connected components in the cleaned mask.
    pub regions: usize,
    pub nuclei: usize,
}
