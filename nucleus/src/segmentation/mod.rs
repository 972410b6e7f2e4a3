//! Foreground segmentation of a single intensity plane.
//!
//! [`Segmenter`] is the substitution point for alternative backends. Two
//! implementations ship: [`AdaptiveSegmenter`] (local threshold, robust to
//! illumination gradients) and [`GlobalSegmenter`] (one Otsu threshold, kept
//! as a baseline).


mod adaptive;
mod global;
mod local_mean;

pub use adaptive::AdaptiveSegmenter;
pub use global::{GlobalSegmenter, otsu_threshold};
pub use local_mean::local_mean;

use common::{BitBuffer2, Buffer2};

use crate::config::{Config, SegmenterKind};

/// Turns an intensity plane into a foreground mask of the same shape.
///
/// A degenerate (zero-variance) plane yields an all-background mask.
pub trait Segmenter: Send + Sync {
    fn name(&self) -> &'static str;

    fn segment(&self, plane: &Buffer2<f32>) -> BitBuffer2;
}

/// Build the segmenter selected by `config.segmenter`.
pub fn segmenter_from_config(config: &Config) -> Box<dyn Segmenter> {
    match config.segmenter {
        SegmenterKind::Adaptive => Box::new(AdaptiveSegmenter::from_config(config)),
        SegmenterKind::GlobalOtsu => Box::new(GlobalSegmenter::new(config.offset)),
    }
}

/// Min and max of the finite pixels, `None` when there are none.
pub(crate) fn finite_range(plane: &[f32]) -> Option<(f32, f32)> {
    plane
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
