use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use log::debug;

use crate::common::error::{QRError, QRResult};

/// Output name when no background picture is given.
pub const DEFAULT_FILE_NAME: &str = "qrcode.png";

/// Appended to the background's file stem to name the output.
pub const FILE_NAME_SUFFIX: &str = "_qrcode.png";

// Output format
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Bmp,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> QRResult<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            _ => Err(QRError::UnsupportedFormat(ext.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> QRResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::from_extension(ext)
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}


// Naming
//------------------------------------------------------------------------------

/// `<stem>_qrcode.png` for a background, `qrcode.png` otherwise.
pub fn default_file_name(background: Option<&Path>) -> String {
    match background.and_then(|p| p.file_stem()).and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => format!("{stem}{FILE_NAME_SUFFIX}"),
        _ => DEFAULT_FILE_NAME.to_string(),
    }
}

/// Checks an explicit output name: a bare file name with a known extension.
pub fn validate_save_name(name: &str) -> QRResult<OutputFormat> {
    let path = Path::new(name);
    let bare = !name.contains(['/', '\\']) && path.file_name().is_some_and(|f| f == name);
    let has_stem = path.file_stem().is_some_and(|s| !s.is_empty());
    if !bare || !has_stem || path.extension().is_none() {
        return Err(QRError::InvalidSavePath(name.to_string()));
    }
    OutputFormat::from_path(path)
}


// Emit
//------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Emitted {
    pub path: Option<PathBuf>,
    pub base64: String,
    pub bytes: Vec<u8>,
}

pub fn encode_image(img: &DynamicImage, fmt: OutputFormat) -> QRResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    let res = match fmt {
        OutputFormat::Jpeg if img.color().has_alpha() => {
            DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut cursor, fmt.image_format())
        }
        _ => img.write_to(&mut cursor, fmt.image_format()),
    };
    res.map_err(QRError::ImageEncodeError)?;
    Ok(bytes)
}

/// Nearest-neighbour upscale for display. A factor of 1 returns `img` as is.
pub fn upscale(img: DynamicImage, factor: u32) -> DynamicImage {
    if factor <= 1 {
        return img;
    }
    let (w, h) = (img.width() * factor, img.height() * factor);
    img.resize_exact(w, h, FilterType::Nearest)
}

/// Encodes `img` and base64-encodes the bytes. Unless `only_base64` is set, the
/// same bytes are written to `save_path` and the path is returned.
pub fn emit(
    img: &DynamicImage,
    fmt: OutputFormat,
    save_path: Option<&Path>,
    only_base64: bool,
) -> QRResult<Emitted> {
    let bytes = encode_image(img, fmt)?;
    let base64 = STANDARD.encode(&bytes);

    let path = match save_path {
        Some(p) if !only_base64 => {
            debug!("Writing {} bytes to {}...", bytes.len(), p.display());
            fs::write(p, &bytes)
                .map_err(|source| QRError::WriteError { path: p.to_path_buf(), source })?;
            Some(p.to_path_buf())
        }
        _ => None,
    };

    Ok(Emitted { path, base64, bytes })
}
