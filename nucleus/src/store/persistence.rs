use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::image::{ImageId, ImageMetadata};
use crate::measure::NucleusRecord;
use crate::summary::ImageSummaryRecord;

use super::{Store, StoreError, write_summary_csv};

/// Run-level persistence: the relational store plus the optional summary
/// CSV that mirrors its `image_summary` table.
pub struct PersistenceLayer {
    store: Store,
    summary_csv: Option<PathBuf>,
}

impl PersistenceLayer {
    /// Open the database at `db_path`. With `overwrite_existing` all stored
    /// rows and any previous summary CSV are removed first.
    pub fn open(
        db_path: impl AsRef<Path>,
        summary_csv: Option<PathBuf>,
        overwrite_existing: bool,
    ) -> Result<Self, StoreError> {
        Self::with_store(Store::open(db_path)?, summary_csv, overwrite_existing)
    }

    pub fn with_store(
        store: Store,
        summary_csv: Option<PathBuf>,
        overwrite_existing: bool,
    ) -> Result<Self, StoreError> {
        if overwrite_existing {
            store.reset()?;
            if let Some(path) = &summary_csv {
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(source) => {
                        return Err(StoreError::Csv {
                            path: path.clone(),
                            source,
                        });
                    }
                }
            }
        }

        Ok(Self { store, summary_csv })
    }

    #[inline]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[inline]
    pub fn summary_csv(&self) -> Option<&Path> {
        self.summary_csv.as_deref()
    }

    pub fn write_image(
        &self,
        image_id: &ImageId,
        metadata: &ImageMetadata,
        records: &[NucleusRecord],
    ) -> Result<(), StoreError> {
        self.store.write_image(image_id, metadata, records)
    }

    /// Recompute every image summary from the nucleus table and rewrite the
    /// CSV export from scratch.
    pub fn finalize(&self) -> Result<Vec<ImageSummaryRecord>, StoreError> {
        let summaries = self.store.rebuild_summaries()?;
        if let Some(path) = &self.summary_csv {
            write_summary_csv(path, &summaries)?;
        }

        tracing::info!(images = summaries.len(), "Finalized run");
        Ok(summaries)
    }

    pub fn close(self) -> Result<(), StoreError> {
        self.store.close()
    }
}
