use std::path::Path;

use image::{
    imageops::{self, BiLevel, FilterType},
    DynamicImage, GrayImage, Luma, Rgba, RgbaImage,
};
use imageproc::{contrast::otsu_level, map::map_colors};
use log::debug;

use crate::common::error::{QRError, QRResult};

// Enhancement
//------------------------------------------------------------------------------

/// Multiplicative contrast and brightness factors. `1.0` leaves the picture
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enhance {
    contrast: f32,
    brightness: f32,
}

impl Default for Enhance {
    fn default() -> Self {
        Self { contrast: 1.0, brightness: 1.0 }
    }
}

impl Enhance {
    pub fn new(contrast: f32, brightness: f32) -> QRResult<Self> {
        for f in [contrast, brightness] {
            if !f.is_finite() || f <= 0.0 {
                return Err(QRError::InvalidFactor(f));
            }
        }
        Ok(Self { contrast, brightness })
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn is_identity(&self) -> bool {
        self.contrast == 1.0 && self.brightness == 1.0
    }

    /// Contrast first, then brightness. Color channels only, alpha is kept.
    pub fn apply(&self, img: &RgbaImage) -> RgbaImage {
        if self.is_identity() {
            return img.clone();
        }

        let mean = mean_luma(img) as f32;
        let contrasted = map_colors(img, |p| blend(p, mean, self.contrast));
        map_colors(&contrasted, |p| blend(p, 0.0, self.brightness))
    }
}

/// `base + f * (channel - base)`, truncated and clipped to a byte.
fn blend(p: Rgba<u8>, base: f32, f: f32) -> Rgba<u8> {
    let Rgba([r, g, b, a]) = p;
    let mix = |c: u8| (base + f * (c as f32 - base)).clamp(0.0, 255.0) as u8;
    Rgba([mix(r), mix(g), mix(b), a])
}

/// ITU-R 601 luma in 16-bit fixed point.
pub fn luma(p: &Rgba<u8>) -> u8 {
    let [r, g, b, _] = p.0;
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

fn mean_luma(img: &RgbaImage) -> u8 {
    let n = img.width() as u64 * img.height() as u64;
    if n == 0 {
        return 0;
    }
    let sum = img.pixels().map(|p| luma(p) as u64).sum::<u64>();
    ((sum as f64 / n as f64) + 0.5) as u8
}

#[cfg(test)]
mod enhance_tests {
    use image::{Rgba, RgbaImage};
    use test_case::test_case;

    use super::{luma, mean_luma, Enhance};
    use crate::common::QRError;

    #[test_case(0.0)]
    #[test_case(-1.0)]
    #[test_case(f32::NAN)]
    #[test_case(f32::INFINITY)]
    fn test_invalid_factor(f: f32) {
        assert!(matches!(Enhance::new(f, 1.0), Err(QRError::InvalidFactor(_))));
        assert!(matches!(Enhance::new(1.0, f), Err(QRError::InvalidFactor(_))));
    }

    #[test]
    fn test_luma() {
        assert_eq!(luma(&Rgba([0, 0, 0, 255])), 0);
        assert_eq!(luma(&Rgba([255, 255, 255, 0])), 255);
        assert_eq!(luma(&Rgba([255, 0, 0, 255])), 76);
        assert_eq!(luma(&Rgba([0, 255, 0, 255])), 150);
        assert_eq!(luma(&Rgba([0, 0, 255, 255])), 29);
    }

    #[test]
    fn test_identity() {
        let img = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8 * 60, y as u8 * 60, 7, 200]));
        assert_eq!(Enhance::default().apply(&img), img);
        assert_eq!(Enhance::new(1.0, 1.0).unwrap().apply(&img), img);
    }

    #[test]
    fn test_brightness() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([100, 200, 51, 128]));
        let brighter = Enhance::new(1.0, 1.5).unwrap().apply(&img);
        assert_eq!(*brighter.get_pixel(0, 0), Rgba([150, 255, 76, 128]));
        let darker = Enhance::new(1.0, 0.5).unwrap().apply(&img);
        assert_eq!(*darker.get_pixel(1, 1), Rgba([50, 100, 25, 128]));
    }

    #[test]
    fn test_contrast() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([200, 200, 200, 0]));
        assert_eq!(mean_luma(&img), 100);

        let stretched = Enhance::new(2.0, 1.0).unwrap().apply(&img);
        assert_eq!(*stretched.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*stretched.get_pixel(1, 0), Rgba([255, 255, 255, 0]));

        let flattened = Enhance::new(0.5, 1.0).unwrap().apply(&img);
        assert_eq!(*flattened.get_pixel(0, 0), Rgba([50, 50, 50, 255]));
        assert_eq!(*flattened.get_pixel(1, 0), Rgba([150, 150, 150, 0]));
    }

    #[test]
    fn test_contrast_before_brightness() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([200, 200, 200, 255]));
        let out = Enhance::new(0.5, 2.0).unwrap().apply(&img);
        assert_eq!(*out.get_pixel(0, 0), Rgba([100, 100, 100, 255]));
        assert_eq!(*out.get_pixel(1, 0), Rgba([255, 255, 255, 255]));
    }
}

// Quantization
//------------------------------------------------------------------------------

/// How the background is reduced to black and white for monochrome output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Quantize {
    /// Floyd-Steinberg error diffusion.
    #[default]
    Dither,
    /// Hard threshold at the Otsu level of the picture.
    Threshold,
}

pub fn quantize(img: &RgbaImage, method: Quantize) -> GrayImage {
    let gray: GrayImage = map_colors(img, |p| Luma([luma(&p)]));
    match method {
        Quantize::Dither => {
            let mut gray = gray;
            imageops::dither(&mut gray, &BiLevel);
            gray
        }
        Quantize::Threshold => {
            let level = otsu_level(&gray);
            map_colors(&gray, |p| Luma([if p[0] > level { 255 } else { 0 }]))
        }
    }
}

#[cfg(test)]
mod quantize_tests {
    use image::{Rgba, RgbaImage};
    use test_case::test_case;

    use super::{quantize, Quantize};

    #[test_case(Quantize::Dither)]
    #[test_case(Quantize::Threshold)]
    fn test_binary_output(method: Quantize) {
        let img =
            RgbaImage::from_fn(16, 16, |x, y| Rgba([(x * 16) as u8, (y * 16) as u8, 90, 255]));
        let out = quantize(&img, method);
        assert_eq!(out.dimensions(), (16, 16));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test_case(Quantize::Dither)]
    #[test_case(Quantize::Threshold)]
    fn test_extremes_preserved(method: Quantize) {
        let img = RgbaImage::from_fn(8, 8, |x, _| {
            if x < 4 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let out = quantize(&img, method);
        for (x, _, p) in out.enumerate_pixels() {
            assert_eq!(p[0], if x < 4 { 0 } else { 255 });
        }
    }

    #[test]
    fn test_dither_mid_gray() {
        let img = RgbaImage::from_pixel(32, 32, Rgba([128, 128, 128, 255]));
        let out = quantize(&img, Quantize::Dither);
        let white = out.pixels().filter(|p| p[0] == 255).count();
        assert!((400..=624).contains(&white), "{white} white pixels");
    }
}

// Background
//------------------------------------------------------------------------------

/// Background ready for compositing: enhanced, resized to cover the canvas
/// interior and, for monochrome output, quantized to 1 bit. Transparency is
/// always read from the RGBA image.
#[derive(Debug, Clone)]
pub struct Background {
    rgba: RgbaImage,
    mono: Option<GrayImage>,
}

impl Background {
    pub fn open(
        path: &Path,
        enhance: Enhance,
        interior: u32,
        colorized: bool,
        method: Quantize,
    ) -> QRResult<Self> {
        debug!("Loading background {}...", path.display());
        let img = image::open(path)
            .map_err(|source| QRError::ImageLoadError { path: path.to_path_buf(), source })?;
        Self::prepare(&img, enhance, interior, colorized, method)
    }

    /// Enhances `img`, then resizes the part of it that covers the top-left
    /// `interior` square. Fails when the resize target overflows.
    pub fn prepare(
        img: &DynamicImage,
        enhance: Enhance,
        interior: u32,
        colorized: bool,
        method: Quantize,
    ) -> QRResult<Self> {
        let rgba = enhance.apply(&img.to_rgba8());
        let (sw, sh) = rgba.dimensions();

        let target = fit_size((sw, sh), interior)?;
        let (cw, ch) = cover_crop((sw, sh), target, interior);
        let (rw, rh) = (scaled_len(cw, target.0, sw), scaled_len(ch, target.1, sh));
        debug!("Resizing background from {sw}x{sh} to {rw}x{rh} (of {target:?})...");

        let cropped = imageops::crop_imm(&rgba, 0, 0, cw, ch).to_image();
        let rgba = imageops::resize(&cropped, rw, rh, FilterType::CatmullRom);

        let mono = if colorized { None } else { Some(quantize(&rgba, method)) };
        Ok(Self { rgba, mono })
    }

    pub fn from_parts(rgba: RgbaImage, mono: Option<GrayImage>) -> Self {
        debug_assert!(
            mono.as_ref().map_or(true, |m| m.dimensions() == rgba.dimensions()),
            "Monochrome layer size differs from the color layer"
        );
        Self { rgba, mono }
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    pub fn mono(&self) -> Option<&GrayImage> {
        self.mono.as_ref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgba.dimensions()
    }

    /// Pixels outside the image count as transparent.
    pub fn is_transparent(&self, x: u32, y: u32) -> bool {
        self.rgba.get_pixel_checked(x, y).map_or(true, |p| p[3] == 0)
    }
}

/// Target size for a `(w, h)` source: the shorter side becomes `interior`, the
/// longer side `interior` times the truncated ratio of the two.
pub fn fit_size((w, h): (u32, u32), interior: u32) -> QRResult<(u32, u32)> {
    let (w, h) = (w.max(1), h.max(1));
    let too_large = || QRError::BackgroundTooLarge { width: w, height: h };
    if w < h {
        Ok((interior, interior.checked_mul(h / w).ok_or_else(too_large)?))
    } else {
        Ok((interior.checked_mul(w / h).ok_or_else(too_large)?, interior))
    }
}

/// Source region that lands on the top-left `interior` square once `(w, h)`
/// is resized to `target`, widened by the filter support.
pub fn cover_crop((w, h): (u32, u32), (tw, th): (u32, u32), interior: u32) -> (u32, u32) {
    let span = |src: u32, dst: u32| {
        let (src, dst) = (src.max(1) as u64, dst.max(1) as u64);
        let need = (interior as u64 * src).div_ceil(dst) + 2 * src.div_ceil(dst) + 1;
        need.min(src) as u32
    };
    (span(w, tw), span(h, th))
}

/// Length `crop` source pixels take once `src` is scaled to `dst`.
fn scaled_len(crop: u32, dst: u32, src: u32) -> u32 {
    (crop as u64 * dst as u64).div_ceil(src.max(1) as u64) as u32
}
