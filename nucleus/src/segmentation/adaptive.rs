use common::{BitBuffer2, Buffer2};

use super::{Segmenter, finite_range, local_mean};
use crate::config::{Config, LocalMethod};

/// Local threshold: a pixel is foreground when it exceeds its neighborhood
/// estimate by more than `offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveSegmenter {
    pub radius: usize,
    pub offset: f32,
    pub method: LocalMethod,
}

impl AdaptiveSegmenter {
    /// A `radius` of 0 is raised to 1.
    pub fn new(radius: usize, offset: f32, method: LocalMethod) -> Self {
        Self {
            radius: radius.max(1),
            offset,
            method,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.neighborhood_radius,
            config.offset,
            config.local_method,
        )
    }
}

impl Segmenter for AdaptiveSegmenter {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn segment(&self, plane: &Buffer2<f32>) -> BitBuffer2 {
        let width = plane.width();
        let height = plane.height();

        match finite_range(plane) {
            Some((lo, hi)) if lo < hi => {}
            _ => {
                tracing::debug!(width, height, "Degenerate plane, empty mask");
                return BitBuffer2::new_default(width, height);
            }
        }

        let local = local_mean(plane, self.radius, self.method);
        let mask = BitBuffer2::from_fn(width, height, |x, y| {
            plane[(x, y)] > local[(x, y)] + self.offset
        });

        tracing::debug!(
            radius = self.radius,
            offset = self.offset,
            method = %self.method,
            foreground = mask.count_ones(),
            "Adaptive threshold"
        );
        mask
    }
}
