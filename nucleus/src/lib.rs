//! Nucleus - segmentation and measurement of fluorescent nuclei in root-tip
//! microscopy images.
//!
//! Each image goes through one fixed pipeline: an adaptive (local) threshold
//! produces a foreground mask, morphological cleanup removes noise and fills
//! nucleoli, connected components become candidate nuclei, and every nucleus
//! is measured against the original intensities. Results land in an SQLite
//! store that replaces, never appends, the rows of a re-processed image.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use nucleus::{Config, ImageMetadata, ImageSource, TiffLoader, run_batch};
//!
//! let config = Config::from_file("nucleus.yaml")?;
//! let sources = vec![ImageSource::from_path("h2b_seedling3_z16.tif", ImageMetadata::default())];
//!
//! let report = run_batch(
//!     config,
//!     &TiffLoader::default(),
//!     &sources,
//!     "nuclei.sqlite",
//!     Some("summary.csv".into()),
//! )?;
//! println!("{} nuclei in {} images", report.total_nuclei(), report.processed.len());
//! ```

pub mod bbox;
pub mod config;
pub mod detector;
pub mod image;
pub mod labeling;
pub mod measure;
pub mod morphology;
pub mod segmentation;
pub mod store;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{Config, ConfigError, Connectivity, LocalMethod, SegmenterKind};

// ============================================================================
// Images
// ============================================================================

pub use image::{
    Image, ImageError, ImageId, ImageLoader, ImageMetadata, ImageSource, Normalization,
    TiffLoader,
};

// ============================================================================
// Detection
// ============================================================================

pub use bbox::Aabb;
pub use detector::{
    BatchReport, DetectionDiagnostics, DetectionResult, ImageFailure, NucleusDetector,
    ProcessError, process_batch, run_batch,
};
pub use labeling::LabelMap;
pub use measure::{MeasureError, MeasurementExtractor, NucleusRecord};
pub use morphology::{CleanupStats, MorphologicalCleaner};
pub use segmentation::{AdaptiveSegmenter, GlobalSegmenter, Segmenter};

// ============================================================================
// Persistence
// ============================================================================

pub use store::{PersistenceLayer, Store, StoreError};
pub use summary::ImageSummaryRecord;
