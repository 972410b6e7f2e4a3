//! Splitting of touching nuclei.
//!
//! Seeds are prominent maxima of the Euclidean distance transform, thinned so
//! that seeds of one component stay at least `min_distance` apart. A
//! marker-based watershed floods each component from its seeds in order of
//! decreasing distance, and a one-pixel cut between basins leaves the labeler
//! with one region per basin.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use common::{BitBuffer2, Buffer2};

use crate::config::Connectivity;
use crate::labeling::LabelMap;

/// Stand-in for infinity in the squared-distance transform.
const FAR: f64 = 1e20;

const FOUR_NEIGHBORS: [(isize, isize); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
const EIGHT_NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

pub(crate) fn neighbor_offsets(connectivity: Connectivity) -> &'static [(isize, isize)] {
    match connectivity {
        Connectivity::Four => &FOUR_NEIGHBORS,
        Connectivity::Eight => &EIGHT_NEIGHBORS,
    }
}

#[inline]
fn offset(x: usize, y: usize, (dx, dy): (isize, isize), width: usize, height: usize) -> Option<(usize, usize)> {
    let nx = x.checked_add_signed(dx)?;
    let ny = y.checked_add_signed(dy)?;
    (nx < width && ny < height).then_some((nx, ny))
}

// ============================================================================
// Distance transform
// ============================================================================

/// Exact Euclidean distance from each foreground pixel to the nearest
/// background pixel. Pixels outside the image count as background.
///
/// Separable squared-distance transform (Felzenszwalb & Huttenlocher),
/// columns then rows, on a grid padded by one background pixel.
pub fn distance_transform(mask: &BitBuffer2) -> Buffer2<f32> {
    let width = mask.width();
    let height = mask.height();
    let pw = width + 2;
    let ph = height + 2;

    let mut grid = vec![0.0f64; pw * ph];
    for (x, y) in mask.iter_set() {
        grid[(y + 1) * pw + x + 1] = FAR;
    }

    let n = pw.max(ph);
    let mut f = vec![0.0f64; n];
    let mut d = vec![0.0f64; n];
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];

    for x in 0..pw {
        for y in 0..ph {
            f[y] = grid[y * pw + x];
        }
        squared_distance_1d(&f[..ph], &mut d[..ph], &mut v, &mut z);
        for y in 0..ph {
            grid[y * pw + x] = d[y];
        }
    }

    for y in 0..ph {
        let row = &mut grid[y * pw..(y + 1) * pw];
        f[..pw].copy_from_slice(row);
        squared_distance_1d(&f[..pw], &mut d[..pw], &mut v, &mut z);
        row.copy_from_slice(&d[..pw]);
    }

    Buffer2::from_fn(width, height, |x, y| grid[(y + 1) * pw + x + 1].sqrt() as f32)
}

/// Lower envelope of parabolas rooted at `(q, f[q])`.
fn squared_distance_1d(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }

    let mut k = 0usize;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let fq = f[q] + (q * q) as f64;
        let mut s;
        loop {
            let p = v[k];
            s = (fq - (f[p] + (p * p) as f64)) / (2.0 * (q as f64 - p as f64));
            if s <= z[k] && k > 0 {
                k -= 1;
            } else {
                break;
            }
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, dq) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let diff = q as f64 - v[k] as f64;
        *dq = diff * diff + f[v[k]];
    }
}

// ============================================================================
// Seeds
// ============================================================================

/// Smallest drop in distance between two maxima of one component for both to
/// seed. Ridges of convex objects wobble by less than a pixel.
const MIN_PEAK_PROMINENCE: f32 = 1.0;

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Prominent distance-transform maxima, thinned per component.
///
/// Foreground pixels are visited strongest first, ties broken by raster
/// position, and merged with visited 8-neighbors of the same component. A
/// region's peak is its first visited pixel. When two regions meet, the later
/// peak stays a candidate only if the meeting pixel lies at least
/// [`MIN_PEAK_PROMINENCE`] below it, so plateaus and ridge steps yield one
/// candidate. Candidates are then accepted in visit order unless an accepted
/// seed of the same component lies closer than `min_distance`. Every
/// non-empty component receives at least one seed.
pub fn find_seeds(dist: &Buffer2<f32>, components: &LabelMap, min_distance: f32) -> Vec<(usize, usize)> {
    const UNVISITED: usize = usize::MAX;

    let width = dist.width();
    let values = dist.pixels();

    let mut order: Vec<usize> = (0..values.len()).filter(|&i| values[i] > 0.0).collect();
    // Stable sort keeps raster order among equal distances.
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let mut parent = vec![UNVISITED; values.len()];
    let mut peak_of = vec![0usize; values.len()];
    let mut visited_at = vec![0usize; values.len()];
    let mut is_peak = vec![false; values.len()];

    for (rank, &p) in order.iter().enumerate() {
        let (x, y) = (p % width, p / width);
        let label = components.get(x, y);
        parent[p] = p;
        peak_of[p] = p;
        visited_at[p] = rank;
        is_peak[p] = true;

        for &o in &EIGHT_NEIGHBORS {
            let Some((nx, ny)) = offset(x, y, o, width, dist.height()) else {
                continue;
            };
            let q = ny * width + nx;
            if parent[q] == UNVISITED || components.get(nx, ny) != label {
                continue;
            }
            let root_q = find_root(&mut parent, q);
            let root_p = find_root(&mut parent, p);
            if root_q == root_p {
                continue;
            }
            let (winner, loser) = if visited_at[peak_of[root_q]] < visited_at[peak_of[root_p]] {
                (root_q, root_p)
            } else {
                (root_p, root_q)
            };
            let lost_peak = peak_of[loser];
            if values[lost_peak] - values[p] < MIN_PEAK_PROMINENCE {
                is_peak[lost_peak] = false;
            }
            parent[loser] = winner;
        }
    }

    let min_sq = min_distance * min_distance;
    let mut seeds: Vec<(usize, usize)> = Vec::new();
    for p in order.into_iter().filter(|&p| is_peak[p]) {
        let (x, y) = (p % width, p / width);
        let label = components.get(x, y);
        let crowded = seeds.iter().any(|&(sx, sy)| {
            let dx = sx as f32 - x as f32;
            let dy = sy as f32 - y as f32;
            components.get(sx, sy) == label && dx * dx + dy * dy < min_sq
        });
        if !crowded {
            seeds.push((x, y));
        }
    }
    seeds
}

// ============================================================================
// Watershed
// ============================================================================

#[derive(Debug)]
struct FloodEntry {
    dist: f32,
    order: u64,
    x: usize,
    y: usize,
}

impl PartialEq for FloodEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloodEntry {}

impl PartialOrd for FloodEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloodEntry {
    /// Max-heap order: larger distance first, then earlier insertion.
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Flood the foreground from `seeds` over the negated distance map.
///
/// Returns basin ids `1..=seeds.len()` (seed order), 0 outside the mask.
pub fn watershed(
    dist: &Buffer2<f32>,
    mask: &BitBuffer2,
    seeds: &[(usize, usize)],
    connectivity: Connectivity,
) -> Buffer2<u32> {
    let width = mask.width();
    let height = mask.height();
    let mut basins = Buffer2::new_filled(width, height, 0u32);
    let mut heap = BinaryHeap::with_capacity(seeds.len() * 4);
    let mut order = 0u64;

    for (i, &(x, y)) in seeds.iter().enumerate() {
        basins[(x, y)] = i as u32 + 1;
        heap.push(FloodEntry {
            dist: dist[(x, y)],
            order,
            x,
            y,
        });
        order += 1;
    }

    let offsets = neighbor_offsets(connectivity);
    while let Some(FloodEntry { x, y, .. }) = heap.pop() {
        let basin = basins[(x, y)];
        for &o in offsets {
            let Some((nx, ny)) = offset(x, y, o, width, height) else {
                continue;
            };
            if mask.get_xy(nx, ny) && basins[(nx, ny)] == 0 {
                basins[(nx, ny)] = basin;
                heap.push(FloodEntry {
                    dist: dist[(nx, ny)],
                    order,
                    x: nx,
                    y: ny,
                });
                order += 1;
            }
        }
    }

    basins
}

/// Remove every pixel adjacent to a basin with a smaller id, so no two
/// basins touch under `connectivity`.
pub fn cut_basins(basins: &Buffer2<u32>, connectivity: Connectivity) -> BitBuffer2 {
    let width = basins.width();
    let height = basins.height();
    let offsets = neighbor_offsets(connectivity);

    BitBuffer2::from_fn(width, height, |x, y| {
        let basin = basins[(x, y)];
        basin != 0
            && !offsets.iter().any(|&o| {
                offset(x, y, o, width, height).is_some_and(|(nx, ny)| {
                    let other = basins[(nx, ny)];
                    other != 0 && other < basin
                })
            })
    })
}

/// Split touching objects. Returns the cut mask and the number of seeds.
///
/// Fragments produced by the cut are left in place; the caller removes the
/// ones below its area threshold.
pub fn declump(mask: &BitBuffer2, min_distance: f32, connectivity: Connectivity) -> (BitBuffer2, usize) {
    if mask.none() {
        return (mask.clone(), 0);
    }

    let dist = distance_transform(mask);
    let components = LabelMap::from_mask(mask, connectivity);
    let seeds = find_seeds(&dist, &components, min_distance);
    let basins = watershed(&dist, mask, &seeds, connectivity);
    let cut = cut_basins(&basins, connectivity);

    tracing::debug!(
        components = components.num_labels(),
        seeds = seeds.len(),
        "Declumped"
    );
    (cut, seeds.len())
}
