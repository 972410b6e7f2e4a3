use glam::DVec2;

use super::*;

fn metadata(region: &str) -> ImageMetadata {
    ImageMetadata {
        region: region.into(),
        genotype: "control".into(),
        seedling: Some(4),
        z_slice: None,
        channel: "c1".into(),
        source_path: Some(PathBuf::from("/data/h2b_4.tif")),
    }
}

fn nucleus(image_id: &ImageId, label: u32, area: usize, mean: f64) -> NucleusRecord {
    NucleusRecord {
        image_id: image_id.clone(),
        label,
        area,
        mean_intensity: mean,
        integrated_intensity: area as f64 * mean,
        centroid: DVec2::new(label as f64 + 0.5, 2.25),
        bbox: Aabb::new(1, 4, 2, 3),
    }
}

#[test]
fn test_fresh_store_is_migrated() {
    let store = Store::open_in_memory().unwrap();
    assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    assert!(store.image_ids().unwrap().is_empty());
    assert_eq!(store.nucleus_count().unwrap(), 0);
}

#[test]
fn test_reopen_keeps_rows_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nuclei.sqlite");
    let id = ImageId::from("a");

    let store = Store::open(&path).unwrap();
    store
        .write_image(&id, &metadata("meristem"), &[nucleus(&id, 1, 10, 2.0)])
        .unwrap();
    store.close().unwrap();

    let store = Store::open(&path).unwrap();
    assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    assert_eq!(store.nucleus_count().unwrap(), 1);
}

#[test]
fn test_newer_schema_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 99").unwrap();
    drop(conn);

    assert!(matches!(
        Store::open(&path),
        Err(StoreError::UnsupportedSchemaVersion {
            found: 99,
            supported: SCHEMA_VERSION
        })
    ));
}

#[test]
fn test_round_trip_nuclei_and_metadata() {
    let store = Store::open_in_memory().unwrap();
    let id = ImageId::from("a");
    let records = vec![nucleus(&id, 1, 10, 2.0), nucleus(&id, 3, 7, 1.5)];

    store
        .write_image(&id, &metadata("meristem"), &records)
        .unwrap();

    assert_eq!(store.nuclei_for(&id).unwrap(), records);
    assert_eq!(store.metadata(&id).unwrap(), Some(metadata("meristem")));
    assert_eq!(store.metadata(&ImageId::from("missing")).unwrap(), None);
}

#[test]
fn test_rewrite_replaces_rows() {
    let store = Store::open_in_memory().unwrap();
    let id = ImageId::from("a");
    let records = vec![nucleus(&id, 1, 10, 2.0), nucleus(&id, 2, 12, 3.0)];

    store
        .write_image(&id, &metadata("meristem"), &records)
        .unwrap();
    store
        .write_image(&id, &metadata("meristem"), &records)
        .unwrap();
    assert_eq!(store.nucleus_count().unwrap(), 2);
    assert_eq!(store.image_ids().unwrap(), vec![id.clone()]);

    let replacement = vec![nucleus(&id, 1, 5, 1.0)];
    store
        .write_image(&id, &metadata("elongation"), &replacement)
        .unwrap();
    assert_eq!(store.nuclei_for(&id).unwrap(), replacement);
    assert_eq!(store.metadata(&id).unwrap().unwrap().region, "elongation");
}

#[test]
fn test_failed_write_rolls_back() {
    let store = Store::open_in_memory().unwrap();
    let id = ImageId::from("a");
    let original = vec![nucleus(&id, 1, 10, 2.0)];
    store
        .write_image(&id, &metadata("meristem"), &original)
        .unwrap();

    // Duplicate label violates the primary key halfway through the insert.
    let broken = vec![nucleus(&id, 1, 4, 1.0), nucleus(&id, 1, 6, 1.0)];
    let err = store
        .write_image(&id, &metadata("elongation"), &broken)
        .unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)));

    assert_eq!(store.nuclei_for(&id).unwrap(), original);
    assert_eq!(store.metadata(&id).unwrap().unwrap().region, "meristem");
}

#[test]
fn test_mismatched_record_id_rejected() {
    let store = Store::open_in_memory().unwrap();
    let id = ImageId::from("a");
    let other = ImageId::from("b");

    let err = store
        .write_image(&id, &metadata("meristem"), &[nucleus(&other, 1, 3, 1.0)])
        .unwrap_err();
    assert!(matches!(err, StoreError::ImageIdMismatch { .. }));
    assert!(store.image_ids().unwrap().is_empty());
}

#[test]
fn test_reset_wipes_everything() {
    let store = Store::open_in_memory().unwrap();
    for name in ["a", "b"] {
        let id = ImageId::from(name);
        store
            .write_image(&id, &metadata("meristem"), &[nucleus(&id, 1, 3, 1.0)])
            .unwrap();
    }
    store.rebuild_summaries().unwrap();

    store.reset().unwrap();
    assert!(store.image_ids().unwrap().is_empty());
    assert_eq!(store.nucleus_count().unwrap(), 0);
    assert!(store.summaries().unwrap().is_empty());
}

#[test]
fn test_summaries_include_zero_nucleus_images() {
    let store = Store::open_in_memory().unwrap();
    let a = ImageId::from("a");
    let empty = ImageId::from("b_empty");
    store
        .write_image(
            &a,
            &metadata("meristem"),
            &[nucleus(&a, 1, 10, 2.0), nucleus(&a, 2, 30, 4.0)],
        )
        .unwrap();
    store
        .write_image(&empty, &metadata("elongation"), &[])
        .unwrap();

    let rebuilt = store.rebuild_summaries().unwrap();
    assert_eq!(store.summaries().unwrap(), rebuilt);
    assert_eq!(rebuilt.len(), 2);

    assert_eq!(rebuilt[0].image_id, a);
    assert_eq!(rebuilt[0].nucleus_count, 2);
    assert_eq!(rebuilt[0].total_area, 40);
    assert_eq!(rebuilt[0].mean_intensity, 3.5);

    assert_eq!(rebuilt[1].image_id, empty);
    assert_eq!(rebuilt[1].nucleus_count, 0);
    assert_eq!(rebuilt[1].mean_area, 0.0);
    assert_eq!(rebuilt[1].region, "elongation");
}

#[test]
fn test_rewrite_drops_stale_summary_row() {
    let store = Store::open_in_memory().unwrap();
    let id = ImageId::from("a");
    store
        .write_image(&id, &metadata("meristem"), &[nucleus(&id, 1, 10, 2.0)])
        .unwrap();
    store.rebuild_summaries().unwrap();
    assert_eq!(store.summaries().unwrap().len(), 1);

    store
        .write_image(&id, &metadata("meristem"), &[])
        .unwrap();
    assert!(store.summaries().unwrap().is_empty());
}

#[test]
fn test_persistence_finalize_rewrites_csv() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("run.sqlite");
    let csv = dir.path().join("summary.csv");

    let layer = PersistenceLayer::open(&db, Some(csv.clone()), true).unwrap();
    let id = ImageId::from("a");
    layer
        .write_image(&id, &metadata("meristem"), &[nucleus(&id, 1, 10, 2.0)])
        .unwrap();
    layer.finalize().unwrap();
    // A second finalize must not append.
    layer.finalize().unwrap();
    layer.close().unwrap();

    let text = std::fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], SUMMARY_CSV_HEADER);
    assert_eq!(lines[1], "a,meristem,control,4,,c1,1,10,20,10,20,2");
}

#[test]
fn test_persistence_overwrite_wipes_previous_run() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("run.sqlite");
    let csv = dir.path().join("summary.csv");
    let id = ImageId::from("a");

    let layer = PersistenceLayer::open(&db, Some(csv.clone()), false).unwrap();
    layer
        .write_image(&id, &metadata("meristem"), &[nucleus(&id, 1, 10, 2.0)])
        .unwrap();
    layer.finalize().unwrap();
    layer.close().unwrap();

    // Without overwrite the previous rows stay.
    let layer = PersistenceLayer::open(&db, Some(csv.clone()), false).unwrap();
    assert_eq!(layer.store().image_ids().unwrap(), vec![id.clone()]);
    layer.close().unwrap();

    let layer = PersistenceLayer::open(&db, Some(csv.clone()), true).unwrap();
    assert!(layer.store().image_ids().unwrap().is_empty());
    assert!(!csv.exists());

    let summaries = layer.finalize().unwrap();
    assert!(summaries.is_empty());
    let text = std::fs::read_to_string(&csv).unwrap();
    assert_eq!(text.lines().count(), 1);
}

#[test]
fn test_store_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Store>();
    assert_send_sync::<PersistenceLayer>();
}
