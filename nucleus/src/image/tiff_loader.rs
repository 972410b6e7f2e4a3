//! TIFF decoding into [`Image`] planes.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use common::Buffer2;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult, Limits};

use super::{Image, ImageError, ImageLoader, ImageSource};

/// Intensity rescaling applied per plane after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Keep raw sample values.
    #[default]
    None,
    /// Stretch each plane's `min..=max` to `0..=255`; constant planes become 0.
    MinMax,
}

/// Loads single or multi-page TIFF files.
///
/// Pages are read in order and grouped `channels` at a time into z-slices.
/// RGB(A) samples are averaged to gray, alpha is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffLoader {
    pub channels: usize,
    pub normalization: Normalization,
}

impl Default for TiffLoader {
    fn default() -> Self {
        Self {
            channels: 1,
            normalization: Normalization::None,
        }
    }
}

impl TiffLoader {
    pub fn with_normalization(normalization: Normalization) -> Self {
        Self {
            normalization,
            ..Default::default()
        }
    }

    fn read_pages(&self, path: &Path) -> Result<Vec<Buffer2<f32>>, ImageError> {
        let decode_err = |source| ImageError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(decode_err)?
            .with_limits(Limits::unlimited());

        let mut pages = Vec::new();
        loop {
            let (width, height) = decoder.dimensions().map_err(decode_err)?;
            let color = decoder.colortype().map_err(decode_err)?;
            let samples = samples_per_pixel(color).ok_or_else(|| ImageError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: format!("color type {color:?}"),
            })?;
            let data = decoder.read_image().map_err(decode_err)?;
            let values = decoding_result_to_f32(data).ok_or_else(|| {
                ImageError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    reason: "sample format".to_string(),
                }
            })?;
            if values.len() != width as usize * height as usize * samples.0 {
                return Err(ImageError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    reason: format!(
                        "{} samples for a {width}x{height} page with {} samples per pixel",
                        values.len(),
                        samples.0
                    ),
                });
            }

            let mut plane = to_gray(values, width as usize, height as usize, samples);
            if self.normalization == Normalization::MinMax {
                normalize_min_max(&mut plane);
            }
            pages.push(plane);

            if !decoder.more_images() {
                break;
            }
            decoder.next_image().map_err(decode_err)?;
        }
        Ok(pages)
    }
}

impl ImageLoader for TiffLoader {
    fn load(&self, source: &ImageSource) -> Result<Image, ImageError> {
        let pages = self.read_pages(&source.path)?;
        let channels = self.channels.max(1);
        let z_slices = pages.len() / channels;

        tracing::debug!(
            path = %source.path.display(),
            pages = pages.len(),
            z_slices,
            channels,
            "Loaded TIFF"
        );

        Image::new(
            source.id.clone(),
            source.metadata.clone(),
            z_slices,
            channels,
            pages,
        )
    }
}

/// Samples per pixel for the supported color types.
fn samples_per_pixel(color: ColorType) -> Option<(usize, usize)> {
    // (total samples, samples averaged into gray)
    match color {
        ColorType::Gray(_) => Some((1, 1)),
        ColorType::GrayA(_) => Some((2, 1)),
        ColorType::RGB(_) => Some((3, 3)),
        ColorType::RGBA(_) => Some((4, 3)),
        _ => None,
    }
}

fn decoding_result_to_f32(data: DecodingResult) -> Option<Vec<f32>> {
    Some(match data {
        DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        _ => return None,
    })
}

fn to_gray(
    values: Vec<f32>,
    width: usize,
    height: usize,
    (samples, averaged): (usize, usize),
) -> Buffer2<f32> {
    if samples == 1 {
        return Buffer2::new(width, height, values);
    }
    let pixels = values
        .chunks_exact(samples)
        .map(|px| px[..averaged].iter().sum::<f32>() / averaged as f32)
        .collect();
    Buffer2::new(width, height, pixels)
}

fn normalize_min_max(plane: &mut Buffer2<f32>) {
    let (lo, hi) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    if !range.is_finite() || range <= 0.0 {
        plane.fill(0.0);
        return;
    }
    plane.iter_mut().for_each(|v| *v = (*v - lo) * 255.0 / range);
}
