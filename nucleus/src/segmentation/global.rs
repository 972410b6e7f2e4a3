use common::{BitBuffer2, Buffer2};

use super::{Segmenter, finite_range};

const HISTOGRAM_BINS: usize = 256;

/// Otsu threshold of the finite pixels, using a 256-bin histogram spanning
/// the plane's own range. Returns the center of the bin that maximizes the
/// between-class variance, or `None` for a degenerate plane.
pub fn otsu_threshold(plane: &[f32]) -> Option<f32> {
    let (lo, hi) = finite_range(plane).filter(|(lo, hi)| lo < hi)?;
    let lo = lo as f64;
    let bin_width = (hi as f64 - lo) / HISTOGRAM_BINS as f64;

    let mut histogram = [0u64; HISTOGRAM_BINS];
    for &v in plane.iter().filter(|v| v.is_finite()) {
        let bin = ((v as f64 - lo) / bin_width) as usize;
        histogram[bin.min(HISTOGRAM_BINS - 1)] += 1;
    }

    let total: f64 = histogram.iter().sum::<u64>() as f64;
    let sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut sum_b = 0.0;
    let mut weight_b = 0.0;
    let mut best_variance = -1.0;
    let mut best_bin = 0;

    for (i, &count) in histogram.iter().enumerate() {
        weight_b += count as f64;
        if weight_b == 0.0 {
            continue;
        }
        let weight_f = total - weight_b;
        if weight_f == 0.0 {
            break;
        }

        sum_b += i as f64 * count as f64;
        let mean_b = sum_b / weight_b;
        let mean_f = (sum - sum_b) / weight_f;
        let variance = weight_b * weight_f * (mean_b - mean_f).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_bin = i;
        }
    }

    Some((lo + (best_bin as f64 + 0.5) * bin_width) as f32)
}

/// One global Otsu threshold for the whole plane, plus `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlobalSegmenter {
    pub offset: f32,
}

impl GlobalSegmenter {
    pub fn new(offset: f32) -> Self {
        Self { offset }
    }
}

impl Segmenter for GlobalSegmenter {
    fn name(&self) -> &'static str {
        "global_otsu"
    }

    fn segment(&self, plane: &Buffer2<f32>) -> BitBuffer2 {
        let Some(threshold) = otsu_threshold(plane) else {
            tracing::debug!("Degenerate plane, empty mask");
            return BitBuffer2::new_default(plane.width(), plane.height());
        };

        let threshold = threshold + self.offset;
        let mask = BitBuffer2::from_fn(plane.width(), plane.height(), |x, y| {
            plane[(x, y)] > threshold
        });
        tracing::debug!(threshold, foreground = mask.count_ones(), "Otsu threshold");
        mask
    }
}
