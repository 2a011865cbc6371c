//! Image preprocessing for the synthesis tool.
//!
//! The tool requires square 1024x1024 inputs. Uploads are rescaled to that
//! size without preserving aspect ratio.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::ImageReader;

/// Pixel size (width, height) the synthesis tool expects.
pub const TARGET_SIZE: (u32, u32) = (1024, 1024);

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("unable to open image {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("unable to write image {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("invalid target size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// Open `source`, rescale it to exactly `target_size` and write it to `dest`.
///
/// The input format is sniffed from content, so the file extension of
/// `source` does not matter. The output format follows `dest`'s extension.
pub fn resize_image(
    source: &Path,
    dest: &Path,
    target_size: (u32, u32),
) -> Result<(), ProcessingError> {
    let (width, height) = target_size;
    if width == 0 || height == 0 {
        return Err(ProcessingError::InvalidSize { width, height });
    }

    let reader = ImageReader::open(source)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| ProcessingError::Open {
            path: source.to_path_buf(),
            source: e,
        })?;

    let img = reader.decode().map_err(|e| ProcessingError::Decode {
        path: source.to_path_buf(),
        source: e,
    })?;

    img.resize_exact(width, height, FilterType::Triangle)
        .save(dest)
        .map_err(|e| ProcessingError::Encode {
            path: dest.to_path_buf(),
            source: e,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
