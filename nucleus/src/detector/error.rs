use thiserror::Error;

use crate::config::ConfigError;
use crate::image::ImageError;
use crate::measure::MeasureError;
use crate::store::StoreError;

/// Why one image, or a whole run, could not be processed.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Measure(#[from] MeasureError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
