use std::path::PathBuf;

use thiserror::Error;

use crate::image::ImageId;

/// Errors raised by the nucleus store and its CSV export.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },

    #[error("Record for image '{found}' cannot be written under image '{expected}'")]
    ImageIdMismatch { expected: ImageId, found: ImageId },

    #[error("Failed to write summary CSV '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
