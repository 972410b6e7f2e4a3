//! Per-image aggregate of nucleus measurements.

use serde::Serialize;

use crate::image::{ImageId, ImageMetadata};
use crate::measure::NucleusRecord;

/// One row of the tabular image summary.
///
/// Derived deterministically from an image's nucleus records; an image with
/// no nuclei has count 0 and all means 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSummaryRecord {
    pub image_id: ImageId,
    pub region: String,
    pub genotype: String,
    pub seedling: Option<u32>,
    pub z_slice: Option<u32>,
    pub channel: String,
    pub nucleus_count: usize,
    pub mean_area: f64,
    pub mean_integrated_intensity: f64,
    pub total_area: usize,
    pub total_integrated_intensity: f64,
    /// Area-weighted: total integrated intensity over total area.
    pub mean_intensity: f64,
}

impl ImageSummaryRecord {
    pub fn from_nuclei(
        image_id: &ImageId,
        metadata: &ImageMetadata,
        nuclei: &[NucleusRecord],
    ) -> Self {
        let nucleus_count = nuclei.len();
        let total_area: usize = nuclei.iter().map(|n| n.area).sum();
        let total_integrated_intensity: f64 = nuclei.iter().map(|n| n.integrated_intensity).sum();

        let per_nucleus = |total: f64| {
            if nucleus_count == 0 {
                0.0
            } else {
                total / nucleus_count as f64
            }
        };
        let mean_intensity = if total_area == 0 {
            0.0
        } else {
            total_integrated_intensity / total_area as f64
        };

        Self {
            image_id: image_id.clone(),
            region: metadata.region.clone(),
            genotype: metadata.genotype.clone(),
            seedling: metadata.seedling,
            z_slice: metadata.z_slice,
            channel: metadata.channel.clone(),
            nucleus_count,
            mean_area: per_nucleus(total_area as f64),
            mean_integrated_intensity: per_nucleus(total_integrated_intensity),
            total_area,
            total_integrated_intensity,
            mean_intensity,
        }
    }
}
