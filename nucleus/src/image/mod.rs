//! Image data model and the loader seam.
//!
//! An [`Image`] is a stack of `z_slices × channels` intensity planes of one
//! shape, plus the acquisition metadata the caller parsed from elsewhere.
//! Images are immutable once built.


mod error;
mod tiff_loader;

pub use error::ImageError;
pub use tiff_loader::{Normalization, TiffLoader};

use std::fmt;
use std::path::PathBuf;

use common::Buffer2;
use serde::{Deserialize, Serialize};

/// Stable identifier of an image across runs (typically the source path).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ImageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Biological and acquisition context of an image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub region: String,
    pub genotype: String,
    pub seedling: Option<u32>,
    pub z_slice: Option<u32>,
    pub channel: String,
    pub source_path: Option<PathBuf>,
}

/// Where to load an image from, and what is already known about it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub id: ImageId,
    pub path: PathBuf,
    pub metadata: ImageMetadata,
}

impl ImageSource {
    /// Source identified by its path, with the path recorded in the metadata.
    pub fn from_path(path: impl Into<PathBuf>, metadata: ImageMetadata) -> Self {
        let path = path.into();
        Self {
            id: ImageId::new(path.to_string_lossy()),
            metadata: ImageMetadata {
                source_path: Some(path.clone()),
                ..metadata
            },
            path,
        }
    }
}

/// Decodes an [`ImageSource`] into an [`Image`].
pub trait ImageLoader {
    fn load(&self, source: &ImageSource) -> Result<Image, ImageError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    id: ImageId,
    metadata: ImageMetadata,
    width: usize,
    height: usize,
    z_slices: usize,
    channels: usize,
    /// z-major: plane `z * channels + c`.
    planes: Vec<Buffer2<f32>>,
}

impl Image {
    /// Assemble an image, checking plane count and shapes.
    pub fn new(
        id: ImageId,
        metadata: ImageMetadata,
        z_slices: usize,
        channels: usize,
        planes: Vec<Buffer2<f32>>,
    ) -> Result<Self, ImageError> {
        let expected = z_slices * channels;
        if expected == 0 || planes.len() != expected {
            return Err(ImageError::PlaneCount {
                expected,
                actual: planes.len(),
                z_slices,
                channels,
            });
        }

        let width = planes[0].width();
        let height = planes[0].height();
        if width == 0 || height == 0 {
            return Err(ImageError::ZeroSize { width, height });
        }

        if let Some((index, plane)) = planes
            .iter()
            .enumerate()
            .find(|(_, p)| p.width() != width || p.height() != height)
        {
            return Err(ImageError::ShapeMismatch {
                index,
                width,
                height,
                actual_width: plane.width(),
                actual_height: plane.height(),
            });
        }

        Ok(Self {
            id,
            metadata,
            width,
            height,
            z_slices,
            channels,
            planes,
        })
    }

    /// Single-plane image.
    pub fn from_plane(
        id: ImageId,
        metadata: ImageMetadata,
        plane: Buffer2<f32>,
    ) -> Result<Self, ImageError> {
        Self::new(id, metadata, 1, 1, vec![plane])
    }

    #[inline]
    pub fn id(&self) -> &ImageId {
        &self.id
    }

    #[inline]
    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn z_slices(&self) -> usize {
        self.z_slices
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn plane(&self, z: usize, channel: usize) -> Result<&Buffer2<f32>, ImageError> {
        if z >= self.z_slices || channel >= self.channels {
            return Err(ImageError::PlaneOutOfRange {
                z,
                channel,
                z_slices: self.z_slices,
                channels: self.channels,
            });
        }
        Ok(&self.planes[z * self.channels + channel])
    }
}
