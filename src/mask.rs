use log::trace;

use crate::common::metadata::{Version, MODULE_SCALE};
use crate::encode::QrBitmap;

/// Finder pattern plus separator, in pixels: 8 modules.
const FINDER_SZ: u32 = 8 * MODULE_SCALE;

/// Timing pattern row/column, in interior pixels: module 6.
const TIMING_START: u32 = 6 * MODULE_SCALE;

// Protected mask
//------------------------------------------------------------------------------

/// Interior pixels a decoder relies on: finder patterns with their separators,
/// the timing cross and every alignment pattern. Coordinates are `(x, y)` with
/// the quiet zone stripped, so `(0, 0)` is the top-left pixel of the symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedMask {
    ver: Version,
    interior: u32,
    grid: Vec<bool>,
}

impl ProtectedMask {
    pub fn build(ver: Version) -> Self {
        let interior = ver.interior_size();
        let grid = vec![false; (interior * interior) as usize];
        let mut mask = Self { ver, interior, grid };

        mask.protect_timing_patterns();
        mask.protect_finder_patterns();
        mask.protect_alignment_patterns();

        trace!("Protected {} of {} interior pixels", mask.len(), interior * interior);
        mask
    }

    pub fn for_bitmap(bmp: &QrBitmap) -> Self {
        Self::build(bmp.version())
    }

    pub fn version(&self) -> Version {
        self.ver
    }

    pub fn interior_size(&self) -> u32 {
        self.interior
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.interior && y < self.interior && self.grid[(y * self.interior + x) as usize]
    }

    pub fn len(&self) -> usize {
        self.grid.iter().filter(|&&p| p).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.grid.contains(&true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let w = self.interior;
        self.grid.iter().enumerate().filter(|(_, &p)| p).map(move |(i, _)| {
            let i = i as u32;
            (i % w, i / w)
        })
    }

    fn protect_rect(&mut self, x0: u32, x1: u32, y0: u32, y1: u32) {
        let (x1, y1) = (x1.min(self.interior), y1.min(self.interior));
        for y in y0..y1 {
            for x in x0..x1 {
                self.grid[(y * self.interior + x) as usize] = true;
            }
        }
    }
}


// Timing pattern
//------------------------------------------------------------------------------

impl ProtectedMask {
    fn protect_timing_patterns(&mut self) {
        let end = TIMING_START + MODULE_SCALE;
        let w = self.interior;
        self.protect_rect(TIMING_START, end, 0, w);
        self.protect_rect(0, w, TIMING_START, end);
    }
}

#[cfg(test)]
mod timing_pattern_tests {
    use super::ProtectedMask;
    use crate::common::Version;

    #[test]
    fn test_timing_cross() {
        let ver = Version::new(1).unwrap();
        let w = ver.interior_size();
        let mask = ProtectedMask::build(ver);
        for i in 0..w {
            for t in 18..21 {
                assert!(mask.contains(t, i));
                assert!(mask.contains(i, t));
            }
            if !(24..w - 24).contains(&i) {
                continue;
            }
            assert!(!mask.contains(17, i));
            assert!(!mask.contains(21, i));
            assert!(!mask.contains(i, 17));
            assert!(!mask.contains(i, 21));
        }
    }
}

// Finder pattern
//------------------------------------------------------------------------------

impl ProtectedMask {
    fn protect_finder_patterns(&mut self) {
        let w = self.interior;
        let far = w - FINDER_SZ;
        self.protect_rect(0, FINDER_SZ, 0, FINDER_SZ);
        self.protect_rect(0, FINDER_SZ, far, w);
        self.protect_rect(far, w, 0, FINDER_SZ);
    }
}


// Alignment pattern
//------------------------------------------------------------------------------

impl ProtectedMask {
    fn protect_alignment_patterns(&mut self) {
        let poses = self.ver.alignment_pattern();
        let last = poses.len().saturating_sub(1);
        for (a, &ra) in poses.iter().enumerate() {
            for (b, &rb) in poses.iter().enumerate() {
                // Coincide with the finder patterns
                if (a == 0 && b == 0) || (a == last && b == 0) || (a == 0 && b == last) {
                    continue;
                }
                self.protect_rect(
                    MODULE_SCALE * (ra - 2),
                    MODULE_SCALE * (ra + 3),
                    MODULE_SCALE * (rb - 2),
                    MODULE_SCALE * (rb + 3),
                );
            }
        }
    }
}
