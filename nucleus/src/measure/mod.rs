//! Per-nucleus measurements from a label map and the original intensities.

#[cfg(test)]
mod tests;

use common::Buffer2;
use glam::DVec2;
use thiserror::Error;

use crate::bbox::Aabb;
use crate::image::ImageId;
use crate::labeling::LabelMap;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasureError {
    #[error("label map {labels:?} does not match plane {plane:?}")]
    ShapeMismatch {
        labels: (usize, usize),
        plane: (usize, usize),
    },
}

/// One detected nucleus.
///
/// `integrated_intensity` is the sum of the region's pixel intensities and
/// `mean_intensity` is that sum divided by `area`, so
/// `integrated_intensity == area * mean_intensity` up to rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct NucleusRecord {
    pub image_id: ImageId,
    pub label: u32,
    /// Pixel count.
    pub area: usize,
    pub mean_intensity: f64,
    pub integrated_intensity: f64,
    /// Unweighted pixel-center centroid.
    pub centroid: DVec2,
    pub bbox: Aabb,
}

#[derive(Debug, Clone, Copy)]
struct RegionSums {
    area: usize,
    intensity: f64,
    x: f64,
    y: f64,
    bbox: Aabb,
}

impl Default for RegionSums {
    fn default() -> Self {
        Self {
            area: 0,
            intensity: 0.0,
            x: 0.0,
            y: 0.0,
            bbox: Aabb::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementExtractor {
    /// Regions smaller than this are dropped.
    pub min_area: usize,
}

impl MeasurementExtractor {
    pub fn new(min_area: usize) -> Self {
        Self { min_area }
    }

    /// One record per label with `area >= min_area`, ordered by label.
    ///
    /// Sums are accumulated in `f64`. `plane` must have the label map's shape.
    pub fn extract(
        &self,
        image_id: &ImageId,
        labels: &LabelMap,
        plane: &Buffer2<f32>,
    ) -> Result<Vec<NucleusRecord>, MeasureError> {
        if labels.width() != plane.width() || labels.height() != plane.height() {
            return Err(MeasureError::ShapeMismatch {
                labels: (labels.width(), labels.height()),
                plane: (plane.width(), plane.height()),
            });
        }

        if labels.num_labels() == 0 {
            return Ok(Vec::new());
        }

        let mut sums = vec![RegionSums::default(); labels.num_labels() + 1];
        for y in 0..plane.height() {
            let label_row = &labels.labels()[y * plane.width()..(y + 1) * plane.width()];
            for (x, (&label, &value)) in label_row.iter().zip(plane.row(y)).enumerate() {
                if label == 0 {
                    continue;
                }
                let s = &mut sums[label as usize];
                s.area += 1;
                s.intensity += value as f64;
                s.x += x as f64;
                s.y += y as f64;
                s.bbox.include(x, y);
            }
        }

        let records: Vec<NucleusRecord> = sums
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, s)| s.area > 0 && s.area >= self.min_area)
            .map(|(label, s)| {
                let area = s.area as f64;
                NucleusRecord {
                    image_id: image_id.clone(),
                    label: label as u32,
                    area: s.area,
                    mean_intensity: s.intensity / area,
                    integrated_intensity: s.intensity,
                    centroid: DVec2::new(s.x / area, s.y / area),
                    bbox: s.bbox,
                }
            })
            .collect();

        tracing::debug!(
            image_id = %image_id,
            regions = labels.num_labels(),
            nuclei = records.len(),
            "Measured regions"
        );
        Ok(records)
    }
}
