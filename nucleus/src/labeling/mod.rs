//! Connected component labeling using union-find.
//!
//! Run-length based: each mask row is split into horizontal runs with
//! word-level bit scanning, runs are merged with overlapping runs of the
//! previous row, and the union-find is flattened into contiguous labels.
//! Provisional labels are handed out in raster order and roots always keep
//! the smaller label, so final labels follow the raster order of each
//! component's first pixel.

#[cfg(test)]
mod tests;

use common::{BitBuffer2, Buffer2};

use crate::config::Connectivity;

// ============================================================================
// Run-Length Encoding
// ============================================================================

/// A horizontal run of foreground pixels.
#[derive(Debug, Clone, Copy)]
struct Run {
    start: u32, // inclusive
    end: u32,   // exclusive
    label: u32,
}

impl Run {
    /// Search window in the previous row, end exclusive.
    #[inline]
    fn search_window(&self, connectivity: Connectivity) -> (u32, u32) {
        match connectivity {
            Connectivity::Four => (self.start, self.end),
            Connectivity::Eight => (self.start.saturating_sub(1), self.end + 1),
        }
    }
}

#[inline]
fn runs_connected(prev: &Run, curr: &Run, connectivity: Connectivity) -> bool {
    match connectivity {
        Connectivity::Four => prev.start < curr.end && prev.end > curr.start,
        Connectivity::Eight => prev.start < curr.end + 1 && prev.end + 1 > curr.start,
    }
}

/// Extract the runs of row `y`, skipping zero words and jumping over bit
/// transitions with trailing-zero counts.
fn extract_runs(mask: &BitBuffer2, y: usize, runs: &mut Vec<Run>) {
    let mut open: Option<u32> = None;

    for (word_idx, &word) in mask.row_words(y).iter().enumerate() {
        let base = (word_idx * 64) as u32;
        if open.is_none() && word == 0 {
            continue;
        }

        let mut bit = 0u32;
        while bit < 64 {
            let rest = word >> bit;
            match open {
                None => {
                    if rest == 0 {
                        break;
                    }
                    bit += rest.trailing_zeros();
                    open = Some(base + bit);
                }
                Some(start) => {
                    bit += (!rest).trailing_zeros();
                    if bit >= 64 {
                        break;
                    }
                    runs.push(Run {
                        start,
                        end: base + bit,
                        label: 0,
                    });
                    open = None;
                }
            }
        }
    }

    // Padding bits are zero, so an open run here reaches the last column.
    if let Some(start) = open {
        runs.push(Run {
            start,
            end: mask.width() as u32,
            label: 0,
        });
    }
}

// ============================================================================
// LabelMap
// ============================================================================

/// A 2D label map: 0 is background, regions are labeled `1..=num_labels`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    labels: Buffer2<u32>,
    num_labels: usize,
}

impl LabelMap {
    /// Label the foreground of `mask` under the given connectivity.
    pub fn from_mask(mask: &BitBuffer2, connectivity: Connectivity) -> Self {
        let width = mask.width();
        let height = mask.height();
        let mut labels = Buffer2::new_filled(width, height, 0u32);

        if width == 0 || height == 0 {
            return Self {
                labels,
                num_labels: 0,
            };
        }

        let num_labels = label_mask(mask, &mut labels, connectivity);
        Self { labels, num_labels }
    }

    /// Number of connected components (excluding background).
    #[inline]
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.labels.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.labels.height()
    }

    #[inline]
    pub fn labels(&self) -> &[u32] {
        self.labels.pixels()
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer2<u32> {
        &self.labels
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.labels[(x, y)]
    }

    /// Pixel count per label, indexed by label (index 0 is background).
    pub fn areas(&self) -> Vec<usize> {
        let mut areas = vec![0usize; self.num_labels + 1];
        for &label in self.labels.iter() {
            areas[label as usize] += 1;
        }
        areas
    }

    /// Mask of every labeled pixel.
    pub fn foreground(&self) -> BitBuffer2 {
        BitBuffer2::from_fn(self.width(), self.height(), |x, y| self.get(x, y) != 0)
    }

    /// Mask of the pixels whose label passes `keep`.
    pub fn select(&self, mut keep: impl FnMut(u32) -> bool) -> BitBuffer2 {
        BitBuffer2::from_fn(self.width(), self.height(), |x, y| {
            let label = self.get(x, y);
            label != 0 && keep(label)
        })
    }
}

impl std::ops::Index<usize> for LabelMap {
    type Output = u32;

    #[inline]
    fn index(&self, idx: usize) -> &Self::Output {
        &self.labels.pixels()[idx]
    }
}

// ============================================================================
// Labeling
// ============================================================================

/// Merge current row's runs with overlapping runs of the previous row.
///
/// Runs without overlap get a fresh provisional label.
fn merge_runs_with_prev(
    curr_runs: &mut [Run],
    prev_runs: &[Run],
    connectivity: Connectivity,
    uf: &mut UnionFind,
) {
    let mut prev_idx = 0;
    for run in curr_runs.iter_mut() {
        let (search_start, search_end) = run.search_window(connectivity);

        while prev_idx < prev_runs.len() && prev_runs[prev_idx].end <= search_start {
            prev_idx += 1;
        }

        let mut assigned_label = None;
        let mut check_idx = prev_idx;
        while check_idx < prev_runs.len() && prev_runs[check_idx].start < search_end {
            let prev_run = &prev_runs[check_idx];
            if runs_connected(prev_run, run, connectivity) {
                match assigned_label {
                    Some(label) if label != prev_run.label => uf.union(label, prev_run.label),
                    None => assigned_label = Some(prev_run.label),
                    _ => {}
                }
            }
            check_idx += 1;
        }

        run.label = assigned_label.unwrap_or_else(|| uf.make_set());
    }
}

fn label_mask(mask: &BitBuffer2, labels: &mut Buffer2<u32>, connectivity: Connectivity) -> usize {
    let width = mask.width();

    let mut uf = UnionFind::new();
    let mut prev_runs: Vec<Run> = Vec::with_capacity(width / 4);
    let mut curr_runs: Vec<Run> = Vec::with_capacity(width / 4);

    for y in 0..mask.height() {
        curr_runs.clear();
        extract_runs(mask, y, &mut curr_runs);

        if curr_runs.is_empty() {
            prev_runs.clear();
            continue;
        }

        merge_runs_with_prev(&mut curr_runs, &prev_runs, connectivity, &mut uf);

        let row = labels.row_mut(y);
        for run in &curr_runs {
            row[run.start as usize..run.end as usize].fill(run.label);
        }

        std::mem::swap(&mut prev_runs, &mut curr_runs);
    }

    uf.flatten_labels(labels.pixels_mut())
}

// ============================================================================
// Union-Find
// ============================================================================

/// Union-find over provisional labels `1..`, roots keep the smaller label.
#[derive(Debug)]
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new() -> Self {
        Self {
            parent: Vec::with_capacity(256),
        }
    }

    #[inline]
    fn make_set(&mut self) -> u32 {
        let label = self.parent.len() as u32 + 1;
        self.parent.push(label);
        label
    }

    /// Find root with two-pass path compression.
    fn find(&mut self, label: u32) -> u32 {
        let mut root = label;
        while self.parent[(root - 1) as usize] != root {
            root = self.parent[(root - 1) as usize];
        }

        let mut current = label;
        while current != root {
            let idx = (current - 1) as usize;
            current = self.parent[idx];
            self.parent[idx] = root;
        }

        root
    }

    #[inline]
    fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (smaller, larger) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[(larger - 1) as usize] = smaller;
        }
    }

    /// Rewrite provisional labels as contiguous `1..=n`, in order of roots.
    fn flatten_labels(&mut self, labels: &mut [u32]) -> usize {
        let len = self.parent.len();
        if len == 0 {
            return 0;
        }

        let mut label_map = vec![0u32; len + 1];
        let mut num_labels = 0u32;

        for i in 1..=len as u32 {
            let root = self.find(i);
            if label_map[root as usize] == 0 {
                num_labels += 1;
                label_map[root as usize] = num_labels;
            }
            label_map[i as usize] = label_map[root as usize];
        }

        for l in labels.iter_mut().filter(|l| **l != 0) {
            *l = label_map[*l as usize];
        }

        num_labels as usize
    }
}
