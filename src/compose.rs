use std::borrow::Cow;

use image::{DynamicImage, GrayImage, Luma};
use log::debug;

use crate::background::{quantize, Background, Quantize};
use crate::common::metadata::{BORDER, MODULE_SCALE};
use crate::encode::QrBitmap;
use crate::mask::ProtectedMask;

// Compositor
//------------------------------------------------------------------------------

/// Center pixel of a module's 3×3 block, in interior coordinates.
pub fn is_module_center(x: u32, y: u32) -> bool {
    x % MODULE_SCALE == MODULE_SCALE / 2 && y % MODULE_SCALE == MODULE_SCALE / 2
}

/// Whether interior pixel `(x, y)` must keep the QR value.
pub fn keeps_qr_pixel(mask: &ProtectedMask, bg: &Background, x: u32, y: u32) -> bool {
    mask.contains(x, y) || is_module_center(x, y) || bg.is_transparent(x, y)
}

/// Interior pixels the background overwrites, row by row.
pub fn replaceable<'a>(
    mask: &'a ProtectedMask,
    bg: &'a Background,
) -> impl Iterator<Item = (u32, u32)> + 'a {
    let w = mask.interior_size();
    (0..w)
        .flat_map(move |y| (0..w).map(move |x| (x, y)))
        .filter(|&(x, y)| !keeps_qr_pixel(mask, bg, x, y))
}

/// Blends `bg` into a copy of `bmp`. Returns RGBA when colorized, gray
/// otherwise. `bmp` is left untouched.
pub fn compose(
    bmp: &QrBitmap,
    mask: &ProtectedMask,
    bg: &Background,
    colorized: bool,
) -> DynamicImage {
    debug_assert!(
        mask.interior_size() == bmp.interior_size(),
        "Mask interior {} doesn't match bitmap interior {}",
        mask.interior_size(),
        bmp.interior_size()
    );

    if colorized {
        debug!("Compositing color background...");
        let mut canvas = DynamicImage::ImageLuma8(bmp.image().clone()).into_rgba8();
        let src = bg.rgba();
        for (x, y) in replaceable(mask, bg) {
            canvas.put_pixel(x + BORDER, y + BORDER, *src.get_pixel(x, y));
        }
        DynamicImage::ImageRgba8(canvas)
    } else {
        debug!("Compositing monochrome background...");
        let mono: Cow<GrayImage> = match bg.mono() {
            Some(m) => Cow::Borrowed(m),
            None => Cow::Owned(quantize(bg.rgba(), Quantize::default())),
        };
        let mut canvas = bmp.image().clone();
        for (x, y) in replaceable(mask, bg) {
            let Luma([v]) = *mono.get_pixel(x, y);
            canvas.put_pixel(x + BORDER, y + BORDER, Luma([v]));
        }
        DynamicImage::ImageLuma8(canvas)
    }
}
