use std::io;
use std::path::PathBuf;

use thiserror::Error;

// Error
//------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum QRError {
    // Input validation
    #[error("Empty data")]
    EmptyData,
    #[error("Unsupported character {0:?}")]
    UnsupportedCharacter(char),
    #[error("Invalid version {0}, expected a value from 1 to 40")]
    InvalidVersion(u8),
    #[error("Invalid error correction level {0:?}, expected one of L, M, Q, H")]
    InvalidErrorLevel(String),
    #[error("Invalid enhancement factor {0}, expected a positive finite value")]
    InvalidFactor(f32),
    #[error("Invalid save name {0:?}")]
    InvalidSavePath(String),
    #[error("Unsupported output format {0:?}")]
    UnsupportedFormat(String),

    // Encoder
    #[error("Data too long")]
    DataTooLong,
    #[error("Encoder failed: {0}")]
    Encoder(String),
    #[error("Bitmap is {width}x{height}, expected {expected}x{expected}")]
    BitmapSizeMismatch { expected: u32, width: u32, height: u32 },

    // Image & filesystem
    #[error("Cannot load image {}", path.display())]
    ImageLoadError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Background {width}x{height} cannot be scaled to cover the symbol")]
    BackgroundTooLarge { width: u32, height: u32 },
    #[error("Cannot encode image")]
    ImageEncodeError(#[source] image::ImageError),
    #[error("Cannot write {}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot create working directory")]
    Workdir(#[source] io::Error),
}

pub type QRResult<T> = Result<T, QRError>;
