use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or assembling an [`Image`](super::Image).
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to read image file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode TIFF '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    #[error("Unsupported pixel format in '{path}': {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Image has zero size ({width}x{height})")]
    ZeroSize { width: usize, height: usize },

    #[error("Expected {expected} planes ({z_slices} z-slices x {channels} channels), got {actual}")]
    PlaneCount {
        expected: usize,
        actual: usize,
        z_slices: usize,
        channels: usize,
    },

    #[error("Plane {index} is {actual_width}x{actual_height}, expected {width}x{height}")]
    ShapeMismatch {
        index: usize,
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("Plane z={z} c={channel} out of range ({z_slices} z-slices x {channels} channels)")]
    PlaneOutOfRange {
        z: usize,
        channel: usize,
        z_slices: usize,
        channels: usize,
    },
}
