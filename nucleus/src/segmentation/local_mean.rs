//! Separable local background estimate with reflected borders.

use common::Buffer2;

use crate::config::LocalMethod;

/// Local mean of every pixel.
///
/// `Gaussian` weights taps with sigma = r / 3, truncated at 4 sigma; `Mean`
/// weights the `(2r+1)²` window uniformly. Borders reflect about the edge
/// (`d c b a | a b c d`), so windows larger than the image are still well
/// defined.
pub fn local_mean(plane: &Buffer2<f32>, radius: usize, method: LocalMethod) -> Buffer2<f32> {
    let width = plane.width();
    let height = plane.height();
    if width == 0 || height == 0 || radius == 0 {
        return plane.clone();
    }

    let (kernel, half_width) = match method {
        LocalMethod::Gaussian => {
            let kernel = gaussian_kernel(radius);
            let half_width = kernel.len() / 2;
            (Some(kernel), half_width)
        }
        LocalMethod::Mean => (None, radius),
    };

    let filter = |line: &[f64], out: &mut [f64], padded: &mut Vec<f64>| {
        pad_reflect(line, half_width, padded);
        match &kernel {
            Some(kernel) => convolve(padded, kernel, out),
            None => box_mean(padded, radius, out),
        }
    };

    let mut padded = Vec::new();

    // Rows
    let mut tmp = Buffer2::new_filled(width, height, 0.0f64);
    let mut line = vec![0.0f64; width];
    for y in 0..height {
        line.iter_mut()
            .zip(plane.row(y))
            .for_each(|(d, &s)| *d = s as f64);
        filter(&line, tmp.row_mut(y), &mut padded);
    }

    // Columns
    let mut out = Buffer2::new_filled(width, height, 0.0f32);
    let mut column = vec![0.0f64; height];
    let mut filtered = vec![0.0f64; height];
    for x in 0..width {
        for (y, v) in column.iter_mut().enumerate() {
            *v = tmp[(x, y)];
        }
        filter(&column, &mut filtered, &mut padded);
        for (y, &v) in filtered.iter().enumerate() {
            out[(x, y)] = v as f32;
        }
    }

    out
}

/// Normalized Gaussian taps, sigma = r / 3, for offsets up to 4 sigma
/// rounded to the nearest pixel.
pub(super) fn gaussian_kernel(radius: usize) -> Vec<f64> {
    let sigma = radius as f64 / 3.0;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let half_width = (4.0 * sigma).round() as isize;
    let mut kernel: Vec<f64> = (-half_width..=half_width)
        .map(|i| (-((i * i) as f64) / two_sigma_sq).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// Index into `0..n` after reflecting `i` about the edges.
#[inline]
pub(super) fn reflect(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period) as usize;
    if m < n { m } else { 2 * n - 1 - m }
}

fn pad_reflect(line: &[f64], pad: usize, padded: &mut Vec<f64>) {
    let n = line.len();
    let p = pad as isize;
    padded.clear();
    padded.extend((-p..n as isize + p).map(|i| line[reflect(i, n)]));
}

fn convolve(padded: &[f64], kernel: &[f64], out: &mut [f64]) {
    for (i, o) in out.iter_mut().enumerate() {
        *o = padded[i..i + kernel.len()]
            .iter()
            .zip(kernel)
            .map(|(v, w)| v * w)
            .sum();
    }
}

fn box_mean(padded: &[f64], radius: usize, out: &mut [f64]) {
    let window = 2 * radius + 1;
    let norm = 1.0 / window as f64;
    let mut sum: f64 = padded[..window].iter().sum();
    for (i, o) in out.iter_mut().enumerate() {
        if i > 0 {
            sum += padded[i + window - 1] - padded[i - 1];
        }
        *o = sum * norm;
    }
}
