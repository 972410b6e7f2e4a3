//! SQLite store of nucleus records, image metadata and image summaries.
//!
//! The schema lives in `migrations/` and is versioned with
//! `PRAGMA user_version`. All writes for one image happen in a single
//! transaction, so a failed write leaves the previous rows for that image
//! untouched.

#[cfg(test)]
mod tests;

mod csv;
mod error;
mod persistence;

pub use csv::{SUMMARY_CSV_HEADER, write_summary_csv};
pub use error::StoreError;
pub use persistence::PersistenceLayer;

use std::path::{Path, PathBuf};

use glam::DVec2;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::bbox::Aabb;
use crate::image::{ImageId, ImageMetadata};
use crate::measure::NucleusRecord;
use crate::summary::ImageSummaryRecord;

pub const SCHEMA_VERSION: i64 = 1;

const NUCLEUS_COLUMNS: &str = "region_label, area, mean_intensity, integrated_intensity, \
centroid_x, centroid_y, bbox_x_min, bbox_y_min, bbox_x_max, bbox_y_max";

const SUMMARY_COLUMNS: &str = "image_id, region, genotype, seedling, z_slice, channel, \
nucleus_count, mean_area, mean_integrated_intensity, total_area, \
total_integrated_intensity, mean_intensity";

/// Mutex-guarded SQLite connection. `Send + Sync`.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let store = Self::from_connection(Connection::open(path)?)?;
        tracing::info!(path = %path.display(), "Opened nucleus store");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        schema_version(&self.conn.lock())
    }

    /// Delete every image, nucleus and summary row.
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM nuclei;
             DELETE FROM image_summary;
             DELETE FROM images;",
        )?;
        tx.commit()?;
        tracing::info!("Reset nucleus store");
        Ok(())
    }

    /// Replace everything stored for `image_id` with `metadata` and `records`.
    ///
    /// Prior image, nucleus and summary rows for the id are deleted in the
    /// same transaction that inserts the new ones. Writing the same image
    /// twice therefore leaves exactly one copy of its rows.
    pub fn write_image(
        &self,
        image_id: &ImageId,
        metadata: &ImageMetadata,
        records: &[NucleusRecord],
    ) -> Result<(), StoreError> {
        if let Some(record) = records.iter().find(|r| &r.image_id != image_id) {
            return Err(StoreError::ImageIdMismatch {
                expected: image_id.clone(),
                found: record.image_id.clone(),
            });
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        delete_image_rows(&tx, image_id)?;

        tx.execute(
            "INSERT INTO images (image_id, region, genotype, seedling, z_slice, channel, source_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                image_id.as_str(),
                metadata.region,
                metadata.genotype,
                metadata.seedling,
                metadata.z_slice,
                metadata.channel,
                metadata
                    .source_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            ],
        )?;

        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO nuclei (image_id, {NUCLEUS_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ))?;
            for r in records {
                insert.execute(params![
                    image_id.as_str(),
                    r.label,
                    r.area as i64,
                    r.mean_intensity,
                    r.integrated_intensity,
                    r.centroid.x,
                    r.centroid.y,
                    r.bbox.x_min as i64,
                    r.bbox.y_min as i64,
                    r.bbox.x_max as i64,
                    r.bbox.y_max as i64,
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(image_id = %image_id, nuclei = records.len(), "Stored image");
        Ok(())
    }

    /// Stored image ids in ascending order.
    pub fn image_ids(&self) -> Result<Vec<ImageId>, StoreError> {
        let conn = self.conn.lock();
        Ok(read_images(&conn)?.into_iter().map(|(id, _)| id).collect())
    }

    pub fn metadata(&self, image_id: &ImageId) -> Result<Option<ImageMetadata>, StoreError> {
        let conn = self.conn.lock();
        let metadata = conn
            .query_row(
                "SELECT region, genotype, seedling, z_slice, channel, source_path
                 FROM images WHERE image_id = ?1",
                [image_id.as_str()],
                metadata_from_row,
            )
            .optional()?;
        Ok(metadata)
    }

    /// Nuclei of one image ordered by label.
    pub fn nuclei_for(&self, image_id: &ImageId) -> Result<Vec<NucleusRecord>, StoreError> {
        read_nuclei(&self.conn.lock(), image_id)
    }

    /// Total number of nucleus rows across all images.
    pub fn nucleus_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM nuclei", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Rows of the `image_summary` table ordered by image id.
    pub fn summaries(&self) -> Result<Vec<ImageSummaryRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM image_summary ORDER BY image_id"
        ))?;
        let rows = stmt
            .query_map([], summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Recompute one summary per stored image from the nucleus table and
    /// replace the contents of `image_summary` with them.
    pub fn rebuild_summaries(&self) -> Result<Vec<ImageSummaryRecord>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let mut summaries = Vec::new();
        for (image_id, metadata) in read_images(&tx)? {
            let nuclei = read_nuclei(&tx, &image_id)?;
            summaries.push(ImageSummaryRecord::from_nuclei(
                &image_id, &metadata, &nuclei,
            ));
        }

        tx.execute("DELETE FROM image_summary", [])?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO image_summary ({SUMMARY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ))?;
            for s in &summaries {
                insert.execute(params![
                    s.image_id.as_str(),
                    s.region,
                    s.genotype,
                    s.seedling,
                    s.z_slice,
                    s.channel,
                    s.nucleus_count as i64,
                    s.mean_area,
                    s.mean_integrated_intensity,
                    s.total_area as i64,
                    s.total_integrated_intensity,
                    s.mean_intensity,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(images = summaries.len(), "Rebuilt image summaries");
        Ok(summaries)
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn
            .into_inner()
            .close()
            .map_err(|(_, err)| StoreError::Sqlite(err))
    }
}

fn schema_version(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let current = schema_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchemaVersion {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }

    if current < 1 {
        conn.execute_batch(include_str!("../../migrations/0001_schema.sql"))?;
        conn.execute_batch("PRAGMA user_version = 1")?;
        tracing::debug!(version = 1, "Applied store migration");
    }
    Ok(())
}

fn delete_image_rows(conn: &Connection, image_id: &ImageId) -> Result<(), StoreError> {
    for table in ["nuclei", "image_summary", "images"] {
        conn.execute(
            &format!("DELETE FROM {table} WHERE image_id = ?1"),
            [image_id.as_str()],
        )?;
    }
    Ok(())
}

fn read_images(conn: &Connection) -> Result<Vec<(ImageId, ImageMetadata)>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT region, genotype, seedling, z_slice, channel, source_path, image_id
         FROM images ORDER BY image_id",
    )?;
    let images = stmt
        .query_map([], |row| {
            let id: String = row.get(6)?;
            Ok((ImageId::from(id), metadata_from_row(row)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(images)
}

fn read_nuclei(conn: &Connection, image_id: &ImageId) -> Result<Vec<NucleusRecord>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NUCLEUS_COLUMNS} FROM nuclei WHERE image_id = ?1 ORDER BY region_label"
    ))?;
    let nuclei = stmt
        .query_map([image_id.as_str()], |row| nucleus_from_row(image_id, row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(nuclei)
}

fn metadata_from_row(row: &Row<'_>) -> rusqlite::Result<ImageMetadata> {
    let source_path: Option<String> = row.get(5)?;
    Ok(ImageMetadata {
        region: row.get(0)?,
        genotype: row.get(1)?,
        seedling: row.get(2)?,
        z_slice: row.get(3)?,
        channel: row.get(4)?,
        source_path: source_path.map(PathBuf::from),
    })
}

fn nucleus_from_row(image_id: &ImageId, row: &Row<'_>) -> rusqlite::Result<NucleusRecord> {
    let index = |i: usize| row.get::<_, i64>(i).map(|v| v as usize);
    Ok(NucleusRecord {
        image_id: image_id.clone(),
        label: row.get(0)?,
        area: index(1)?,
        mean_intensity: row.get(2)?,
        integrated_intensity: row.get(3)?,
        centroid: DVec2::new(row.get(4)?, row.get(5)?),
        bbox: Aabb::new(index(6)?, index(8)?, index(7)?, index(9)?),
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<ImageSummaryRecord> {
    let id: String = row.get(0)?;
    Ok(ImageSummaryRecord {
        image_id: ImageId::from(id),
        region: row.get(1)?,
        genotype: row.get(2)?,
        seedling: row.get(3)?,
        z_slice: row.get(4)?,
        channel: row.get(5)?,
        nucleus_count: row.get::<_, i64>(6)? as usize,
        mean_area: row.get(7)?,
        mean_integrated_intensity: row.get(8)?,
        total_area: row.get::<_, i64>(9)? as usize,
        total_integrated_intensity: row.get(10)?,
        mean_intensity: row.get(11)?,
    })
}
