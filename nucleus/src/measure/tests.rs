use common::BitBuffer2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::config::Connectivity;

fn id() -> ImageId {
    ImageId::from("img")
}

#[test]
fn test_empty_label_map() {
    let mask = BitBuffer2::new_default(8, 8);
    let labels = LabelMap::from_mask(&mask, Connectivity::Eight);
    let plane = Buffer2::new_filled(8, 8, 5.0f32);

    assert!(MeasurementExtractor::new(1).extract(&id(), &labels, &plane).unwrap().is_empty());
}

#[test]
fn test_square_region() {
    // 3x2 block at x 2..5, y 1..3 with intensities x + 10 * y.
    let mask = BitBuffer2::from_fn(6, 4, |x, y| (2..5).contains(&x) && (1..3).contains(&y));
    let labels = LabelMap::from_mask(&mask, Connectivity::Eight);
    let plane = Buffer2::from_fn(6, 4, |x, y| (x + 10 * y) as f32);

    let records = MeasurementExtractor::new(1).extract(&id(), &labels, &plane).unwrap();

    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.label, 1);
    assert_eq!(r.area, 6);
    // Row 1: 12 + 13 + 14, row 2: 22 + 23 + 24.
    assert_eq!(r.integrated_intensity, 108.0);
    assert_eq!(r.mean_intensity, 18.0);
    assert_eq!(r.centroid, DVec2::new(3.0, 1.5));
    assert_eq!(r.bbox, Aabb::new(2, 4, 1, 2));
}

#[test]
fn test_min_area_guard_and_label_order() {
    let mut mask = BitBuffer2::new_default(10, 10);
    mask.set_xy(0, 0, true);
    for y in 4..7 {
        for x in 4..7 {
            mask.set_xy(x, y, true);
        }
    }
    mask.set_xy(9, 9, true);
    mask.set_xy(8, 9, true);

    let labels = LabelMap::from_mask(&mask, Connectivity::Eight);
    assert_eq!(labels.num_labels(), 3);
    let plane = Buffer2::new_filled(10, 10, 1.0f32);

    let records = MeasurementExtractor::new(2).extract(&id(), &labels, &plane).unwrap();
    let summary: Vec<(u32, usize)> = records.iter().map(|r| (r.label, r.area)).collect();
    assert_eq!(summary, vec![(2, 9), (3, 2)]);
}

#[test]
fn test_integrated_equals_area_times_mean() {
    let mut rng = StdRng::seed_from_u64(42);
    let mask = BitBuffer2::from_fn(64, 48, |x, y| ((x / 6) + (y / 5)) % 3 != 0);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);
    let plane = Buffer2::from_fn(64, 48, |_, _| rng.random_range(0.0f32..65535.0));

    let records = MeasurementExtractor::new(1).extract(&id(), &labels, &plane).unwrap();
    assert!(!records.is_empty());

    let mut total_area = 0;
    for r in &records {
        let product = r.area as f64 * r.mean_intensity;
        let tolerance = 1e-6 * r.integrated_intensity.abs().max(1.0);
        assert!((product - r.integrated_intensity).abs() <= tolerance);
        assert!(r.centroid.x >= r.bbox.x_min as f64 && r.centroid.x <= r.bbox.x_max as f64);
        assert!(r.centroid.y >= r.bbox.y_min as f64 && r.centroid.y <= r.bbox.y_max as f64);
        total_area += r.area;
    }
    assert_eq!(total_area, mask.count_ones());
}

#[test]
fn test_shape_mismatch_is_an_error() {
    let mask = BitBuffer2::new_filled(4, 4, true);
    let labels = LabelMap::from_mask(&mask, Connectivity::Eight);
    let plane = Buffer2::new_filled(5, 4, 0.0f32);
    let err = MeasurementExtractor::new(1)
        .extract(&id(), &labels, &plane)
        .unwrap_err();
    assert_eq!(
        err,
        MeasureError::ShapeMismatch {
            labels: (4, 4),
            plane: (5, 4),
        }
    );
    assert!(err.to_string().contains("does not match plane"));
}
