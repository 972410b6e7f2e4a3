//! Synthetic fluorescence planes for detection tests.
//!
//! Planes are built additively: start from a background, stamp nuclei, then
//! optionally add seeded noise.

use common::Buffer2;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A flat disk-shaped nucleus.
#[derive(Debug, Clone, Copy)]
pub struct Blob {
    pub center: Vec2,
    pub radius: f32,
    pub amplitude: f32,
}

impl Blob {
    pub fn new(x: f32, y: f32, radius: f32, amplitude: f32) -> Self {
        Self {
            center: Vec2::new(x, y),
            radius,
            amplitude,
        }
    }

    /// Whether the pixel center (x, y) lies inside the disk.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        Vec2::new(x as f32, y as f32).distance_squared(self.center) <= self.radius * self.radius
    }
}

/// Uniform plane.
pub fn uniform(width: usize, height: usize, level: f32) -> Buffer2<f32> {
    Buffer2::new_filled(width, height, level)
}

/// Horizontal linear gradient from `left` at x = 0 to `right` at the last column.
pub fn horizontal_gradient(width: usize, height: usize, left: f32, right: f32) -> Buffer2<f32> {
    let span = (width.max(2) - 1) as f32;
    Buffer2::from_fn(width, height, |x, _| left + (right - left) * x as f32 / span)
}

/// Add every blob's amplitude to the pixels it covers.
pub fn add_blobs(plane: &mut Buffer2<f32>, blobs: &[Blob]) {
    for y in 0..plane.height() {
        for x in 0..plane.width() {
            let added: f32 = blobs
                .iter()
                .filter(|b| b.contains(x, y))
                .map(|b| b.amplitude)
                .sum();
            plane[(x, y)] += added;
        }
    }
}

/// Add uniform noise in `-amplitude..amplitude` from a fixed seed.
pub fn add_noise(plane: &mut Buffer2<f32>, amplitude: f32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for p in plane.iter_mut() {
        *p += rng.random_range(-amplitude..amplitude);
    }
}

/// Number of pixels covered by a blob.
pub fn blob_area(blob: &Blob, width: usize, height: usize) -> usize {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .filter(|&(x, y)| blob.contains(x, y))
        .count()
}
