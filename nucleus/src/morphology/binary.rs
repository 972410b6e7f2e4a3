//! Binary dilation, erosion, closing and opening with disk elements.
//!
//! A disk of radius r is decomposed into one horizontal span per row offset,
//! so each output pixel costs `2r + 1` range queries against per-row prefix
//! counts. Dilation treats pixels outside the image as background; erosion
//! ignores them.

use common::BitBuffer2;

/// Half-width of the disk's span at each row offset `-r..=r`.
fn disk_spans(radius: usize) -> Vec<usize> {
    let r = radius as isize;
    let r_sq = (r * r) as f64;
    (-r..=r)
        .map(|dy| (r_sq - (dy * dy) as f64).sqrt().floor() as usize)
        .collect()
}

/// Per-row inclusive prefix counts, `width + 1` entries per row.
fn row_prefix_counts(mask: &BitBuffer2) -> Vec<u32> {
    let width = mask.width();
    let stride = width + 1;
    let mut prefix = vec![0u32; stride * mask.height()];
    for y in 0..mask.height() {
        let row = &mut prefix[y * stride..(y + 1) * stride];
        for x in 0..width {
            row[x + 1] = row[x] + mask.get_xy(x, y) as u32;
        }
    }
    prefix
}

pub fn dilate(mask: &BitBuffer2, radius: usize) -> BitBuffer2 {
    if radius == 0 || mask.none() {
        return mask.clone();
    }

    let width = mask.width();
    let height = mask.height();
    let stride = width + 1;
    let spans = disk_spans(radius);
    let prefix = row_prefix_counts(mask);
    let r = radius as isize;

    BitBuffer2::from_fn(width, height, |x, y| {
        spans.iter().enumerate().any(|(i, &half)| {
            let sy = y as isize + i as isize - r;
            if sy < 0 || sy as usize >= height {
                return false;
            }
            let row = &prefix[sy as usize * stride..(sy as usize + 1) * stride];
            let lo = x.saturating_sub(half);
            let hi = (x + half + 1).min(width);
            row[hi] > row[lo]
        })
    })
}

pub fn erode(mask: &BitBuffer2, radius: usize) -> BitBuffer2 {
    if radius == 0 {
        return mask.clone();
    }
    dilate(&mask.inverted(), radius).inverted()
}

/// Dilation followed by erosion: bridges gaps narrower than the disk.
pub fn close(mask: &BitBuffer2, radius: usize) -> BitBuffer2 {
    erode(&dilate(mask, radius), radius)
}

/// Erosion followed by dilation: removes specks and spurs thinner than the disk.
pub fn open(mask: &BitBuffer2, radius: usize) -> BitBuffer2 {
    dilate(&erode(mask, radius), radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_spans() {
        assert_eq!(disk_spans(1), vec![0, 1, 0]);
        assert_eq!(disk_spans(2), vec![0, 1, 2, 1, 0]);
        assert_eq!(disk_spans(3), vec![0, 2, 2, 3, 2, 2, 0]);
    }

    #[test]
    fn test_dilate_single_pixel_is_disk() {
        let mut mask = BitBuffer2::new_default(11, 11);
        mask.set_xy(5, 5, true);

        let dilated = dilate(&mask, 2);

        // Disk of radius 2: 13 pixels.
        assert_eq!(dilated.count_ones(), 13);
        assert!(dilated.get_xy(5, 3));
        assert!(dilated.get_xy(6, 6));
        assert!(!dilated.get_xy(7, 7));
    }

    #[test]
    fn test_dilate_clips_at_border() {
        let mut mask = BitBuffer2::new_default(5, 5);
        mask.set_xy(0, 0, true);
        let dilated = dilate(&mask, 1);
        assert_eq!(dilated.count_ones(), 3);
    }

    #[test]
    fn test_erode_ignores_outside() {
        // A full mask stays full: out-of-image pixels do not erode the frame.
        let mask = BitBuffer2::new_filled(6, 4, true);
        assert_eq!(erode(&mask, 2), mask);
    }

    #[test]
    fn test_erode_square() {
        let mask = BitBuffer2::from_fn(9, 9, |x, y| (2..7).contains(&x) && (2..7).contains(&y));
        let eroded = erode(&mask, 1);
        assert_eq!(eroded.count_ones(), 9);
        assert!(eroded.get_xy(3, 3));
        assert!(!eroded.get_xy(2, 4));
    }

    #[test]
    fn test_close_bridges_gap() {
        // Two bars separated by a one-pixel gap join after closing.
        let mask = BitBuffer2::from_fn(12, 7, |x, y| (2..5).contains(&y) && x != 6 && (1..11).contains(&x));
        let closed = close(&mask, 1);
        assert!(closed.get_xy(6, 3));
        assert!(mask.iter_set().all(|(x, y)| closed.get_xy(x, y)));
    }

    #[test]
    fn test_open_removes_speck() {
        let mut mask = BitBuffer2::from_fn(12, 12, |x, y| (3..9).contains(&x) && (3..9).contains(&y));
        mask.set_xy(0, 11, true);
        let opened = open(&mask, 1);
        assert!(!opened.get_xy(0, 11));
        assert!(opened.get_xy(5, 5));
        assert!(opened.count_ones() <= mask.count_ones());
    }

    #[test]
    fn test_zero_radius_is_identity() {
        let mask = BitBuffer2::from_fn(7, 5, |x, y| (x + y) % 3 == 0);
        assert_eq!(dilate(&mask, 0), mask);
        assert_eq!(erode(&mask, 0), mask);
        assert_eq!(close(&mask, 0), mask);
        assert_eq!(open(&mask, 0), mask);
    }
}
