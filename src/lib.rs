//! # artqr
//!
//! A Rust library for blending a background picture into a QR code while keeping every
//! structure a decoder relies on intact.
//!
//! ## Features
//!
//! - **Structural Mask**: Finder patterns, separators, timing patterns and alignment patterns are never touched
//! - **Module Centers**: The center pixel of every module keeps its QR value, so the payload stays readable
//! - **Transparency**: Transparent background pixels let the QR show through
//! - **Monochrome or Color**: 1-bit dithered output by default, full RGBA output when colorized
//! - **Image Enhancement**: Contrast and brightness factors applied before blending
//! - **Base64 Output**: The encoded image is always returned as base64, optionally written to disk as well
//!
//! ## Quick Start
//!
//! ### Plain QR Code
//!
//! ```rust,no_run
//! use artqr::ArtQRBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Writes ./qrcode.png
//! let art = ArtQRBuilder::new("HELLO WORLD").build()?;
//! println!("{}", art.base64());
//! # Ok(())
//! # }
//! ```
//!
//! ### Artistic QR Code
//!
//! ```rust,no_run
//! use artqr::{ArtQRBuilder, ECLevel, Quantize};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let art = ArtQRBuilder::new("https://example.com")
//!     .version(5)                   // Smallest version to try - grows until the text fits
//!     .ec_level(ECLevel::H)         // Error correction level - defaults to ECLevel::H
//!     .background("cat.png")        // Picture blended into the code
//!     .colorized(true)              // Keep the picture's colors - defaults to 1-bit output
//!     .contrast(1.2)                // Enhancement factors - 1.0 leaves the picture untouched
//!     .brightness(1.1)
//!     .quantize(Quantize::Dither)   // Only used for 1-bit output
//!     .save_dir("out")              // Writes out/cat_qrcode.png
//!     .scale(4)                     // Nearest-neighbour upscale - defaults to 3
//!     .build()?;
//!
//! println!("Saved to {:?}, version {}", art.path(), art.version());
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! The QR is rendered with 3x3 pixels per module and a 4 module quiet zone. The background is
//! resized so its shorter side covers the symbol, then every symbol pixel is replaced by the
//! background unless it belongs to a function pattern, is the center of a module, or is
//! transparent in the background. Scanners sample module centers and locate the symbol through
//! its function patterns, so the code still reads with a high error correction level.
//!
//! ### Error Correction Levels
//! - **L (Low)**: ~7% error correction
//! - **M (Medium)**: ~15% error correction
//! - **Q (Quartile)**: ~25% error correction
//! - **H (High)**: ~30% error correction, recommended for artistic codes

#![allow(clippy::items_after_test_module)]

pub mod background;
pub mod builder;
pub(crate) mod common;
pub mod compose;
pub mod encode;
pub mod mask;
pub mod output;

pub use background::{Background, Enhance, Quantize};
pub use builder::{generate, ArtQR, ArtQRBuilder, DEFAULT_SAVE_DIR, DEFAULT_SCALE};
pub use common::error::{QRError, QRResult};
pub use common::metadata::{
    alignment_pattern_positions, ECLevel, Version, BORDER, MODULE_SCALE, QUIET_ZONE,
};
pub use compose::compose;
pub use encode::{ModuleEncoder, QrBitmap, QrEncoder};
pub use mask::ProtectedMask;
pub use output::{OutputFormat, DEFAULT_FILE_NAME};
