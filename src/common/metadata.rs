use std::fmt::{Display, Error, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use super::error::{QRError, QRResult};

// Geometry
//------------------------------------------------------------------------------

/// Pixels per module edge in the rendered bitmap.
pub const MODULE_SCALE: u32 = 3;

/// Quiet zone width in modules, on every side.
pub const QUIET_ZONE: u32 = 4;

/// Quiet zone width in pixels. Interior coordinates start here.
pub const BORDER: u32 = QUIET_ZONE * MODULE_SCALE;

// Version
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash)]
pub struct Version(u8);

impl Version {
    pub const MIN: Version = Version(1);
    pub const MAX: Version = Version(40);

    pub fn new(version: u8) -> QRResult<Self> {
        if !(1..=40).contains(&version) {
            return Err(QRError::InvalidVersion(version));
        }
        Ok(Self(version))
    }

    /// Width of the symbol in modules, without quiet zone.
    pub const fn width(self) -> u32 {
        self.0 as u32 * 4 + 17
    }

    /// Width of the rendered bitmap in pixels, quiet zone included.
    pub const fn canvas_size(self) -> u32 {
        (self.width() + 2 * QUIET_ZONE) * MODULE_SCALE
    }

    /// Width of the canvas minus the quiet zone on both sides.
    pub const fn interior_size(self) -> u32 {
        self.canvas_size() - 2 * BORDER
    }

    pub fn alignment_pattern(self) -> &'static [u32] {
        ALIGNMENT_PATTERN_POSITIONS[(self.0 - 1) as usize]
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1).ok()
    }
}

impl Deref for Version {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        write!(f, "{}", self.0)
    }
}

/// Alignment pattern centers, in module coordinates, for a raw version number.
pub fn alignment_pattern_positions(version: u8) -> QRResult<&'static [u32]> {
    Ok(Version::new(version)?.alignment_pattern())
}


// Error correction level
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash)]
pub enum ECLevel {
    L = 0,
    M = 1,
    Q = 2,
    H = 3,
}

impl TryFrom<char> for ECLevel {
    type Error = QRError;
    fn try_from(c: char) -> QRResult<Self> {
        match c {
            'L' => Ok(Self::L),
            'M' => Ok(Self::M),
            'Q' => Ok(Self::Q),
            'H' => Ok(Self::H),
            _ => Err(QRError::InvalidErrorLevel(c.to_string())),
        }
    }
}

impl FromStr for ECLevel {
    type Err = QRError;
    fn from_str(s: &str) -> QRResult<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::try_from(c),
            _ => Err(QRError::InvalidErrorLevel(s.to_string())),
        }
    }
}

impl Display for ECLevel {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let c = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(c)
    }
}


// Supported characters
//------------------------------------------------------------------------------

pub const SUPPORTED_PUNCTUATION: &str = " ·,.:;+-*/\\~!@#$%^&`'=<>[]()?_{}|";

pub fn is_supported_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || SUPPORTED_PUNCTUATION.contains(c)
}

pub fn validate_text(text: &str) -> QRResult<()> {
    if text.is_empty() {
        return Err(QRError::EmptyData);
    }
    match text.chars().find(|&c| !is_supported_char(c)) {
        Some(c) => Err(QRError::UnsupportedCharacter(c)),
        None => Ok(()),
    }
}


// Global constants
//------------------------------------------------------------------------------

static ALIGNMENT_PATTERN_POSITIONS: [&[u32]; 40] = [
    &[],
    &[6, 18],
    &[6, 22],
    &[6, 26],
    &[6, 30],
    &[6, 34],
    &[6, 22, 38],
    &[6, 24, 42],
    &[6, 26, 46],
    &[6, 28, 50],
    &[6, 30, 54],
    &[6, 32, 58],
    &[6, 34, 62],
    &[6, 26, 46, 66],
    &[6, 26, 48, 70],
    &[6, 26, 50, 74],
    &[6, 30, 54, 78],
    &[6, 30, 56, 82],
    &[6, 30, 58, 86],
    &[6, 34, 62, 90],
    &[6, 28, 50, 72, 94],
    &[6, 26, 50, 74, 98],
    &[6, 30, 54, 78, 102],
    &[6, 28, 54, 80, 106],
    &[6, 32, 58, 84, 110],
    &[6, 30, 58, 86, 114],
    &[6, 34, 62, 90, 118],
    &[6, 26, 50, 74, 98, 122],
    &[6, 30, 54, 78, 102, 126],
    &[6, 26, 52, 78, 104, 130],
    &[6, 30, 56, 82, 108, 134],
    &[6, 34, 60, 86, 112, 138],
    &[6, 30, 58, 86, 114, 142],
    &[6, 34, 62, 90, 118, 146],
    &[6, 30, 54, 78, 102, 126, 150],
    &[6, 24, 50, 76, 102, 128, 154],
    &[6, 28, 54, 80, 106, 132, 158],
    &[6, 32, 58, 84, 110, 136, 162],
    &[6, 26, 54, 82, 110, 138, 166],
    &[6, 30, 58, 86, 114, 142, 170],
];
