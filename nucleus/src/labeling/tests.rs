//! Tests for connected component labeling.

#![allow(clippy::identity_op, clippy::erasing_op)]

use super::*;

fn label8(mask: &BitBuffer2) -> LabelMap {
    LabelMap::from_mask(mask, Connectivity::Eight)
}

fn label4(mask: &BitBuffer2) -> LabelMap {
    LabelMap::from_mask(mask, Connectivity::Four)
}

/// Parse an ASCII mask, `#` is foreground.
fn mask_from_rows(rows: &[&str]) -> BitBuffer2 {
    let height = rows.len();
    let width = rows[0].len();
    BitBuffer2::from_fn(width, height, |x, y| rows[y].as_bytes()[x] == b'#')
}

#[test]
fn empty_mask() {
    let mask = BitBuffer2::new_default(4, 4);
    let label_map = label8(&mask);

    assert_eq!(label_map.num_labels(), 0);
    assert!(label_map.labels().iter().all(|&l| l == 0));
}

#[test]
fn zero_sized_mask() {
    let mask = BitBuffer2::new_default(0, 0);
    let label_map = label8(&mask);
    assert_eq!(label_map.num_labels(), 0);
    assert!(label_map.labels().is_empty());
}

#[test]
fn single_pixel() {
    let mut mask = BitBuffer2::new_default(4, 4);
    mask.set_xy(1, 1, true);

    let label_map = label8(&mask);

    assert_eq!(label_map.num_labels(), 1);
    assert_eq!(label_map[1 * 4 + 1], 1);
    assert_eq!(label_map.labels().iter().filter(|&&l| l == 1).count(), 1);
}

#[test]
fn horizontal_and_vertical_lines() {
    let mask = mask_from_rows(&[
        ".....", //
        "###..",
        "....#",
        "....#",
    ]);
    let label_map = label4(&mask);

    assert_eq!(label_map.num_labels(), 2);
    assert_eq!(label_map.get(0, 1), 1);
    assert_eq!(label_map.get(2, 1), 1);
    assert_eq!(label_map.get(4, 2), 2);
    assert_eq!(label_map.get(4, 3), 2);
}

#[test]
fn diagonal_depends_on_connectivity() {
    let mask = mask_from_rows(&[
        "#...", //
        ".#..",
        "..#.",
        "....",
    ]);

    assert_eq!(label4(&mask).num_labels(), 3);
    assert_eq!(label8(&mask).num_labels(), 1);
}

#[test]
fn u_shape_merges_into_one() {
    // Two arms get separate provisional labels and merge on the bottom row.
    let mask = mask_from_rows(&[
        "#...#", //
        "#...#",
        "#####",
    ]);
    let label_map = label4(&mask);

    assert_eq!(label_map.num_labels(), 1);
    assert!(mask.iter_set().all(|(x, y)| label_map.get(x, y) == 1));
}

#[test]
fn labels_follow_raster_order_of_first_pixel() {
    // The component starting at (5, 0) must get label 1 even though the
    // component at (0, 1) extends further right on lower rows.
    let mask = mask_from_rows(&[
        ".....#..", //
        "#....#..",
        "#.......",
        "########",
    ]);
    let label_map = label4(&mask);

    assert_eq!(label_map.num_labels(), 2);
    assert_eq!(label_map.get(5, 0), 1);
    assert_eq!(label_map.get(0, 1), 2);
    assert_eq!(label_map.get(7, 3), 2);
}

#[test]
fn runs_across_word_boundaries() {
    // 150 px wide rows: a run spanning words 0..2 and a run ending at the
    // last column.
    let mut mask = BitBuffer2::new_default(150, 3);
    for x in 10..140 {
        mask.set_xy(x, 1, true);
    }
    for x in 145..150 {
        mask.set_xy(x, 1, true);
    }
    mask.set_xy(64, 0, true);

    let label_map = label4(&mask);

    assert_eq!(label_map.num_labels(), 2);
    assert_eq!(label_map.get(64, 0), 1);
    assert_eq!(label_map.get(10, 1), 1);
    assert_eq!(label_map.get(139, 1), 1);
    assert_eq!(label_map.get(140, 1), 0);
    assert_eq!(label_map.get(149, 1), 2);
    assert_eq!(label_map.areas(), vec![150 * 3 - 136, 131, 5]);
}

#[test]
fn full_row_of_whole_words() {
    let mask = BitBuffer2::new_filled(128, 2, true);
    let label_map = label8(&mask);
    assert_eq!(label_map.num_labels(), 1);
    assert!(label_map.labels().iter().all(|&l| l == 1));
}

#[test]
fn foreground_matches_mask() {
    let mask = mask_from_rows(&[
        "##..#.##", //
        "#..##..#",
        "...#....",
        "##....##",
    ]);

    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let label_map = LabelMap::from_mask(&mask, connectivity);
        assert_eq!(label_map.foreground(), mask);

        let max = label_map.labels().iter().copied().max().unwrap_or(0);
        assert_eq!(max as usize, label_map.num_labels());
        let areas = label_map.areas();
        assert!(areas[1..].iter().all(|&a| a > 0));
    }
}

#[test]
fn deterministic_labels() {
    let mask = mask_from_rows(&[
        "#.#.#.#", //
        ".#.#.#.",
        "#.#.#.#",
    ]);
    assert_eq!(label4(&mask), label4(&mask));
    assert_eq!(label4(&mask).num_labels(), 11);
    assert_eq!(label8(&mask).num_labels(), 1);
}

#[test]
fn select_keeps_chosen_labels() {
    let mask = mask_from_rows(&[
        "#..#", //
        "#..#",
    ]);
    let label_map = label8(&mask);
    let kept = label_map.select(|label| label == 2);
    assert_eq!(kept.count_ones(), 2);
    assert!(kept.get_xy(3, 0));
    assert!(!kept.get_xy(0, 0));
}

#[test]
fn linear_index_matches_xy() {
    let mask = mask_from_rows(&[
        "##..", //
        "...#",
    ]);
    let label_map = label8(&mask);
    assert_eq!(label_map[0], 1);
    assert_eq!(label_map[2], 0);
    // Row 1, column 3.
    assert_eq!(label_map[7], label_map.get(3, 1));
    assert_eq!(label_map[7], 2);
}
