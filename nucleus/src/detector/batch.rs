use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::image::{ImageId, ImageLoader, ImageSource};
use crate::store::{PersistenceLayer, StoreError};
use crate::summary::ImageSummaryRecord;

use super::{NucleusDetector, ProcessError};

/// An image that could not be processed, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFailure {
    pub image_id: ImageId,
    pub reason: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Successfully stored images with their nucleus counts, in input order.
    pub processed: Vec<(ImageId, usize)>,
    pub failures: Vec<ImageFailure>,
    /// Summaries rebuilt by the final `finalize`, ordered by image id.
    pub summaries: Vec<ImageSummaryRecord>,
}

impl BatchReport {
    pub fn total_nuclei(&self) -> usize {
        self.processed.iter().map(|(_, n)| n).sum()
    }
}

/// Load, detect and store every source one at a time, then finalize.
///
/// A failure to load, detect or store one image is logged and recorded in
/// the report; the batch moves on to the next source. Only a failing
/// `finalize` aborts the run.
pub fn process_batch(
    detector: &NucleusDetector,
    loader: &dyn ImageLoader,
    sources: &[ImageSource],
    persistence: &PersistenceLayer,
) -> Result<BatchReport, StoreError> {
    tracing::info!(
        images = sources.len(),
        segmenter = detector.segmenter_name(),
        "Starting batch"
    );

    let mut report = BatchReport::default();
    for (i, source) in sources.iter().enumerate() {
        match process_image(detector, loader, source, persistence) {
            Ok(count) => {
                tracing::info!(
                    image_id = %source.id,
                    nuclei = count,
                    "Processed image {}/{}",
                    i + 1,
                    sources.len()
                );
                report.processed.push((source.id.clone(), count));
            }
            Err(err) => {
                tracing::warn!(image_id = %source.id, error = %err, "Skipping image");
                report.failures.push(ImageFailure {
                    image_id: source.id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    report.summaries = persistence.finalize()?;
    tracing::info!(
        processed = report.processed.len(),
        failed = report.failures.len(),
        nuclei = report.total_nuclei(),
        "Batch finished"
    );
    Ok(report)
}

/// Validate `config`, open the store at `db_path` and run [`process_batch`].
///
/// The store is opened, and wiped when `config.overwrite_existing` is set,
/// only after the configuration has been accepted. Configuration and store
/// failures are fatal to the run.
pub fn run_batch(
    config: Config,
    loader: &dyn ImageLoader,
    sources: &[ImageSource],
    db_path: impl AsRef<Path>,
    summary_csv: Option<PathBuf>,
) -> Result<BatchReport, ProcessError> {
    let overwrite_existing = config.overwrite_existing;
    let detector = NucleusDetector::new(config)?;
    let persistence = PersistenceLayer::open(db_path, summary_csv, overwrite_existing)?;
    let report = process_batch(&detector, loader, sources, &persistence)?;
    persistence.close()?;
    Ok(report)
}

fn process_image(
    detector: &NucleusDetector,
    loader: &dyn ImageLoader,
    source: &ImageSource,
    persistence: &PersistenceLayer,
) -> Result<usize, ProcessError> {
    let image = loader.load(source)?;
    let result = detector.detect(&image)?;
    persistence.write_image(image.id(), image.metadata(), &result.nuclei)?;
    Ok(result.nuclei.len())
}
