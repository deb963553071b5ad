use std::path::Path;

use image::{GrayImage, Luma};
use log::{debug, trace};
use qrcode::types::QrError;

use crate::common::{
    error::{QRError, QRResult},
    metadata::{ECLevel, Version, MODULE_SCALE, QUIET_ZONE},
};

pub const DARK: Luma<u8> = Luma([0]);
pub const LIGHT: Luma<u8> = Luma([255]);

// QR bitmap
//------------------------------------------------------------------------------

/// A rendered symbol: 3×3 pixels per module, 4 light modules of quiet zone on
/// every side.
#[derive(Debug, Clone, PartialEq)]
pub struct QrBitmap {
    ver: Version,
    ecl: ECLevel,
    img: GrayImage,
}

impl QrBitmap {
    pub fn new(ver: Version, ecl: ECLevel, img: GrayImage) -> QRResult<Self> {
        let expected = ver.canvas_size();
        let (width, height) = img.dimensions();
        if width != expected || height != expected {
            return Err(QRError::BitmapSizeMismatch { expected, width, height });
        }
        Ok(Self { ver, ecl, img })
    }

    /// Renders a row-major module matrix, `true` being dark.
    pub fn from_modules(ver: Version, ecl: ECLevel, modules: &[bool]) -> QRResult<Self> {
        let w = ver.width();
        if modules.len() != (w * w) as usize {
            return Err(QRError::Encoder(format!(
                "{} modules given for a {w}x{w} symbol",
                modules.len()
            )));
        }

        let qz_sz = QUIET_ZONE * MODULE_SCALE;
        let qr_sz = w * MODULE_SCALE;
        let total_sz = ver.canvas_size();

        let img = GrayImage::from_fn(total_sz, total_sz, |x, y| {
            if x < qz_sz || x >= qz_sz + qr_sz || y < qz_sz || y >= qz_sz + qr_sz {
                return LIGHT;
            }
            let r = (y - qz_sz) / MODULE_SCALE;
            let c = (x - qz_sz) / MODULE_SCALE;
            if modules[(r * w + c) as usize] {
                DARK
            } else {
                LIGHT
            }
        });

        Ok(Self { ver, ecl, img })
    }

    pub fn version(&self) -> Version {
        self.ver
    }

    pub fn ec_level(&self) -> ECLevel {
        self.ecl
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn interior_size(&self) -> u32 {
        self.ver.interior_size()
    }

    pub fn image(&self) -> &GrayImage {
        &self.img
    }

    pub fn into_image(self) -> GrayImage {
        self.img
    }

    /// Module color sampled at the center pixel of module `(r, c)`.
    pub fn is_dark(&self, r: u32, c: u32) -> bool {
        let x = (QUIET_ZONE + c) * MODULE_SCALE + MODULE_SCALE / 2;
        let y = (QUIET_ZONE + r) * MODULE_SCALE + MODULE_SCALE / 2;
        self.img.get_pixel(x, y)[0] < 128
    }

    pub fn metadata(&self) -> String {
        format!("{{ Version: {}, Ec level: {}, Size: {}px }}", self.ver, self.ecl, self.width())
    }
}

#[cfg(test)]
mod bitmap_tests {
    use image::GrayImage;

    use super::{QrBitmap, DARK, LIGHT};
    use crate::common::{ECLevel, QRError, Version};

    #[test]
    fn test_from_modules() {
        let ver = Version::new(1).unwrap();
        let w = ver.width() as usize;
        let mut modules = vec![false; w * w];
        modules[0] = true;
        modules[w + 2] = true;

        let bmp = QrBitmap::from_modules(ver, ECLevel::H, &modules).unwrap();
        assert_eq!(bmp.width(), 87);
        assert!(bmp.is_dark(0, 0));
        assert!(bmp.is_dark(1, 2));
        assert!(!bmp.is_dark(2, 1));

        let img = bmp.image();
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(*img.get_pixel(12 + i, 12 + j), DARK);
            }
        }
        assert_eq!(*img.get_pixel(11, 12), LIGHT);
        assert_eq!(*img.get_pixel(15, 12), LIGHT);
        assert_eq!(*img.get_pixel(18, 15), DARK);
    }

    #[test]
    fn test_quiet_zone_is_light() {
        let ver = Version::new(2).unwrap();
        let w = ver.width() as usize;
        let bmp = QrBitmap::from_modules(ver, ECLevel::L, &vec![true; w * w]).unwrap();
        let img = bmp.image();
        let sz = bmp.width();
        for i in 0..sz {
            for b in 0..12 {
                assert_eq!(*img.get_pixel(i, b), LIGHT);
                assert_eq!(*img.get_pixel(b, i), LIGHT);
                assert_eq!(*img.get_pixel(i, sz - 1 - b), LIGHT);
                assert_eq!(*img.get_pixel(sz - 1 - b, i), LIGHT);
            }
        }
    }

    #[test]
    fn test_size_mismatch() {
        let ver = Version::new(3).unwrap();
        let res = QrBitmap::new(ver, ECLevel::M, GrayImage::new(90, 90));
        assert!(matches!(
            res,
            Err(QRError::BitmapSizeMismatch { expected: 111, width: 90, height: 90 })
        ));
        assert!(QrBitmap::from_modules(ver, ECLevel::M, &[true; 10]).is_err());
    }
}

// Encoder
//------------------------------------------------------------------------------

/// Turns text into a rendered symbol.
///
/// `workdir` is scratch space owned by the caller for the duration of the call.
/// It is removed afterwards whether encoding succeeds or not.
pub trait QrEncoder {
    fn encode(&self, text: &str, ver: Version, ecl: ECLevel, workdir: &Path)
        -> QRResult<QrBitmap>;
}

/// Default encoder backed by the `qrcode` crate. Starts at the requested
/// version and upgrades it until the data fits.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleEncoder;

impl QrEncoder for ModuleEncoder {
    fn encode(
        &self,
        text: &str,
        ver: Version,
        ecl: ECLevel,
        _workdir: &Path,
    ) -> QRResult<QrBitmap> {
        let mut candidate = Some(ver);
        while let Some(v) = candidate {
            trace!("Trying version {v}...");
            match qrcode::QrCode::with_version(text, qrcode::Version::Normal(*v as i16), ec(ecl)) {
                Ok(code) => {
                    if v != ver {
                        debug!("Version upgraded from {ver} to {v} to fit data");
                    }
                    let modules = code
                        .to_colors()
                        .into_iter()
                        .map(|c| c == qrcode::Color::Dark)
                        .collect::<Vec<_>>();
                    return QrBitmap::from_modules(v, ecl, &modules);
                }
                Err(QrError::DataTooLong) => candidate = v.next(),
                Err(e) => return Err(QRError::Encoder(e.to_string())),
            }
        }
        Err(QRError::DataTooLong)
    }
}

fn ec(ecl: ECLevel) -> qrcode::EcLevel {
    match ecl {
        ECLevel::L => qrcode::EcLevel::L,
        ECLevel::M => qrcode::EcLevel::M,
        ECLevel::Q => qrcode::EcLevel::Q,
        ECLevel::H => qrcode::EcLevel::H,
    }
}
