//! Mask cleanup between segmentation and labeling.
//!
//! Order matters: closing and opening smooth the raw threshold mask, holes
//! are filled before small objects are removed (so a nucleus with a dim
//! nucleolus is not fragmented), border objects are cleared, and declumping
//! runs last on the cleaned objects.


pub mod binary;
pub mod declump;
pub mod holes;

use common::BitBuffer2;

use crate::config::{Config, Connectivity};

/// Counts recorded while cleaning one mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub foreground_in: usize,
    pub holes_filled: usize,
    pub small_removed: usize,
    pub border_removed: usize,
    pub declump_seeds: usize,
    pub foreground_out: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphologicalCleaner {
    pub closing_radius: usize,
    pub opening_radius: usize,
    pub max_hole_area: usize,
    pub min_area: usize,
    pub clear_border: bool,
    pub declump: bool,
    pub declump_min_distance: f32,
    pub connectivity: Connectivity,
}

impl MorphologicalCleaner {
    pub fn from_config(config: &Config) -> Self {
        Self {
            closing_radius: config.closing_radius,
            opening_radius: config.opening_radius,
            max_hole_area: config.max_hole_area,
            min_area: config.min_area,
            clear_border: config.clear_border,
            declump: config.declump,
            declump_min_distance: config.declump_min_distance,
            connectivity: config.connectivity,
        }
    }

    pub fn clean(&self, mask: &BitBuffer2) -> BitBuffer2 {
        self.clean_with_stats(mask).0
    }

    pub fn clean_with_stats(&self, mask: &BitBuffer2) -> (BitBuffer2, CleanupStats) {
        let mut stats = CleanupStats {
            foreground_in: mask.count_ones(),
            ..Default::default()
        };

        let smoothed = binary::open(&binary::close(mask, self.closing_radius), self.opening_radius);

        let filled = holes::fill_holes(&smoothed, self.max_hole_area, self.connectivity);
        stats.holes_filled = filled.count_ones() - smoothed.count_ones();

        let mut cleaned = holes::remove_small(&filled, self.min_area, self.connectivity);
        stats.small_removed = filled.count_ones() - cleaned.count_ones();

        if self.clear_border {
            let before = cleaned.count_ones();
            cleaned = holes::clear_border(&cleaned, self.connectivity);
            stats.border_removed = before - cleaned.count_ones();
        }

        if self.declump {
            let (cut, seeds) =
                declump::declump(&cleaned, self.declump_min_distance, self.connectivity);
            stats.declump_seeds = seeds;
            cleaned = holes::remove_small(&cut, self.min_area, self.connectivity);
        }

        stats.foreground_out = cleaned.count_ones();
        tracing::debug!(?stats, "Mask cleaned");
        (cleaned, stats)
    }
}
