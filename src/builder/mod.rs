use std::env;
use std::io;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageError};
use log::debug;
use tempfile::TempDir;

use crate::background::{Background, Enhance, Quantize};
use crate::common::{
    error::{QRError, QRResult},
    metadata::{validate_text, ECLevel, Version},
};
use crate::compose::compose;
use crate::encode::{ModuleEncoder, QrBitmap, QrEncoder};
use crate::mask::ProtectedMask;
use crate::output::{default_file_name, emit, upscale, validate_save_name, OutputFormat};

/// Directory the output is written to unless configured otherwise.
pub const DEFAULT_SAVE_DIR: &str = ".";

/// Upscale factor of the final image. At 1 a module keeps a single QR pixel.
pub const DEFAULT_SCALE: u32 = 3;

const WORKDIR_PREFIX: &str = ".artqr-";

// Result
//------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ArtQR {
    path: Option<PathBuf>,
    base64: String,
    bytes: Vec<u8>,
    image: DynamicImage,
    version: Version,
    ec_level: ECLevel,
}

impl ArtQR {
    /// Where the image was written, `None` in base64-only mode.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    /// Encoded file bytes, identical to what was written to `path`.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    /// Version actually used, after any upgrade by the encoder.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn ec_level(&self) -> ECLevel {
        self.ec_level
    }
}

// Builder
//------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ArtQRBuilder<'a> {
    text: &'a str,
    version: u8,
    ec_level: ECLevel,
    background: Option<PathBuf>,
    colorized: bool,
    contrast: f32,
    brightness: f32,
    quantize: Quantize,
    save_dir: PathBuf,
    save_name: Option<String>,
    only_base64: bool,
    scale: u32,
    workdir_root: Option<PathBuf>,
}

impl<'a> ArtQRBuilder<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            version: 1,
            ec_level: ECLevel::H,
            background: None,
            colorized: false,
            contrast: 1.0,
            brightness: 1.0,
            quantize: Quantize::default(),
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            save_name: None,
            only_base64: false,
            scale: DEFAULT_SCALE,
            workdir_root: None,
        }
    }

    pub fn text(&mut self, text: &'a str) -> &mut Self {
        self.text = text;
        self
    }

    /// Smallest version to try. The default encoder moves up from here.
    pub fn version(&mut self, version: u8) -> &mut Self {
        self.version = version;
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    pub fn background<P: Into<PathBuf>>(&mut self, path: P) -> &mut Self {
        self.background = Some(path.into());
        self
    }

    pub fn unset_background(&mut self) -> &mut Self {
        self.background = None;
        self
    }

    pub fn colorized(&mut self, colorized: bool) -> &mut Self {
        self.colorized = colorized;
        self
    }

    pub fn contrast(&mut self, contrast: f32) -> &mut Self {
        self.contrast = contrast;
        self
    }

    pub fn brightness(&mut self, brightness: f32) -> &mut Self {
        self.brightness = brightness;
        self
    }

    pub fn quantize(&mut self, quantize: Quantize) -> &mut Self {
        self.quantize = quantize;
        self
    }

    pub fn save_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.save_dir = dir.into();
        self
    }

    /// Bare file name; its extension picks the format. Defaults to
    /// `<background stem>_qrcode.png`, or `qrcode.png` without a background.
    pub fn save_name<S: Into<String>>(&mut self, name: S) -> &mut Self {
        self.save_name = Some(name.into());
        self
    }

    pub fn only_base64(&mut self, only_base64: bool) -> &mut Self {
        self.only_base64 = only_base64;
        self
    }

    /// Nearest-neighbour upscale applied to the final image. 1 keeps the
    /// canvas resolution.
    pub fn scale(&mut self, scale: u32) -> &mut Self {
        self.scale = scale;
        self
    }

    /// Parent of the per-call working directory. Defaults to the OS temp dir.
    pub fn workdir_root<P: Into<PathBuf>>(&mut self, root: P) -> &mut Self {
        self.workdir_root = Some(root.into());
        self
    }

    pub fn metadata(&self) -> String {
        let bg = match &self.background {
            Some(p) => p.display().to_string(),
            None => "None".to_string(),
        };
        format!(
            "{{ Version: {}, Ec level: {}, Background: {bg}, Colorized: {}, Contrast: {}, \
             Brightness: {} }}",
            self.version, self.ec_level, self.colorized, self.contrast, self.brightness
        )
    }
}


// Validation
//------------------------------------------------------------------------------

/// Everything `build` needs once the configuration has been checked.
#[derive(Debug)]
struct Plan {
    version: Version,
    enhance: Enhance,
    format: OutputFormat,
    save_path: PathBuf,
}

impl ArtQRBuilder<'_> {
    fn validate(&self) -> QRResult<Plan> {
        validate_text(self.text)?;
        let version = Version::new(self.version)?;
        let enhance = Enhance::new(self.contrast, self.brightness)?;
        if self.scale == 0 {
            return Err(QRError::InvalidFactor(0.0));
        }

        let name = match &self.save_name {
            Some(n) => n.clone(),
            None => default_file_name(self.background.as_deref()),
        };
        let format = validate_save_name(&name)?;

        if let Some(bg) = &self.background {
            if !bg.is_file() {
                let source = io::Error::new(io::ErrorKind::NotFound, "background not found");
                return Err(QRError::ImageLoadError {
                    path: bg.clone(),
                    source: ImageError::IoError(source),
                });
            }
        }

        if !self.only_base64 && !self.save_dir.is_dir() {
            let source = io::Error::new(io::ErrorKind::NotFound, "save directory not found");
            return Err(QRError::WriteError { path: self.save_dir.clone(), source });
        }

        Ok(Plan { version, enhance, format, save_path: self.save_dir.join(name) })
    }
}


// Build
//------------------------------------------------------------------------------

impl ArtQRBuilder<'_> {
    pub fn build(&self) -> QRResult<ArtQR> {
        self.build_with(&ModuleEncoder)
    }

    /// Runs the pipeline with a custom encoder. The encoder gets a fresh
    /// working directory which is removed before this returns.
    pub fn build_with<E: QrEncoder + ?Sized>(&self, encoder: &E) -> QRResult<ArtQR> {
        debug!("Generating artistic QR {}...", self.metadata());
        let plan = self.validate()?;

        let workdir = self.create_workdir()?;
        let res = self.run(encoder, &plan, workdir.path());
        let cleanup = workdir.close().map_err(QRError::Workdir);

        let art = res?;
        cleanup?;
        debug!("Artistic QR generated");
        Ok(art)
    }

    fn create_workdir(&self) -> QRResult<TempDir> {
        let root = self.workdir_root.clone().unwrap_or_else(env::temp_dir);
        tempfile::Builder::new().prefix(WORKDIR_PREFIX).tempdir_in(root).map_err(QRError::Workdir)
    }

    fn run<E: QrEncoder + ?Sized>(
        &self,
        encoder: &E,
        plan: &Plan,
        workdir: &Path,
    ) -> QRResult<ArtQR> {
        debug!("Encoding text...");
        let bmp = encoder.encode(self.text, plan.version, self.ec_level, workdir)?;
        debug!("Encoded QR {}", bmp.metadata());

        let img = match &self.background {
            Some(path) => self.blend(&bmp, path, plan.enhance)?,
            None => DynamicImage::ImageLuma8(bmp.image().clone()),
        };
        let img = upscale(img, self.scale);

        let save_path = Some(plan.save_path.as_path());
        let out = emit(&img, plan.format, save_path, self.only_base64)?;

        Ok(ArtQR {
            path: out.path,
            base64: out.base64,
            bytes: out.bytes,
            image: img,
            version: bmp.version(),
            ec_level: bmp.ec_level(),
        })
    }

    fn blend(&self, bmp: &QrBitmap, path: &Path, enhance: Enhance) -> QRResult<DynamicImage> {
        let interior = bmp.interior_size();
        let bg = Background::open(path, enhance, interior, self.colorized, self.quantize)?;

        debug!("Building protected mask...");
        let mask = ProtectedMask::for_bitmap(bmp);

        Ok(compose(bmp, &mask, &bg, self.colorized))
    }
}

/// One-call form of [`ArtQRBuilder`] with the default scale. `save_path`
/// overrides both the save directory and the default file name.
#[allow(clippy::too_many_arguments)]
pub fn generate(
    text: &str,
    version: u8,
    ec_level: ECLevel,
    background: Option<&Path>,
    colorized: bool,
    contrast: f32,
    brightness: f32,
    save_path: Option<&Path>,
    only_base64: bool,
) -> QRResult<ArtQR> {
    let mut builder = ArtQRBuilder::new(text);
    builder
        .version(version)
        .ec_level(ec_level)
        .colorized(colorized)
        .contrast(contrast)
        .brightness(brightness)
        .only_base64(only_base64);

    if let Some(bg) = background {
        builder.background(bg);
    }

    if let Some(path) = save_path {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| QRError::InvalidSavePath(path.display().to_string()))?;
        builder.save_name(name);
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => builder.save_dir(dir),
            _ => builder.save_dir(DEFAULT_SAVE_DIR),
        };
    }

    builder.build()
}

#[cfg(test)]
mod build_tests {
    use std::cell::Cell;
    use std::fs;
    use std::path::Path;

    use base64::{engine::general_purpose::STANDARD, Engine};
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    use super::{generate, ArtQRBuilder, DEFAULT_SCALE};
    use crate::common::{ECLevel, QRError, QRResult, Version};
    use crate::encode::{ModuleEncoder, QrBitmap, QrEncoder};

    struct CountingEncoder(Cell<usize>);

    impl QrEncoder for CountingEncoder {
        fn encode(
            &self,
            text: &str,
            ver: Version,
            ecl: ECLevel,
            workdir: &Path,
        ) -> QRResult<QrBitmap> {
            self.0.set(self.0.get() + 1);
            assert!(workdir.is_dir());
            ModuleEncoder.encode(text, ver, ecl, workdir)
        }
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_plain_qr() {
        let save = tempdir().unwrap();
        let root = tempdir().unwrap();
        let encoder = CountingEncoder(Cell::new(0));

        let art = ArtQRBuilder::new("HELLO")
            .save_dir(save.path())
            .workdir_root(root.path())
            .build_with(&encoder)
            .unwrap();

        assert_eq!(encoder.0.get(), 1);
        assert_eq!(art.path(), Some(save.path().join("qrcode.png").as_path()));
        assert_eq!(fs::read(save.path().join("qrcode.png")).unwrap(), art.bytes());
        assert_eq!(STANDARD.decode(art.base64()).unwrap(), art.bytes());
        assert_eq!(art.image().width(), DEFAULT_SCALE * Version::new(1).unwrap().canvas_size());
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn test_validation_precedes_workdir() {
        let root = tempdir().unwrap();
        let encoder = CountingEncoder(Cell::new(0));

        let res = ArtQRBuilder::new("héllo")
            .only_base64(true)
            .workdir_root(root.path())
            .build_with(&encoder);

        assert!(matches!(res, Err(QRError::UnsupportedCharacter('é'))));
        assert_eq!(encoder.0.get(), 0);
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn test_bad_background_cleans_workdir() {
        let dir = tempdir().unwrap();
        let root = tempdir().unwrap();
        let bg = dir.path().join("fake.png");
        fs::write(&bg, b"not an image").unwrap();

        let res = ArtQRBuilder::new("HELLO")
            .background(&bg)
            .only_base64(true)
            .workdir_root(root.path())
            .build();

        assert!(matches!(res, Err(QRError::ImageLoadError { .. })));
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn test_generate_save_path() {
        let dir = tempdir().unwrap();
        let bg = dir.path().join("cat.png");
        RgbaImage::from_pixel(40, 40, Rgba([200, 30, 30, 255])).save(&bg).unwrap();

        let out = dir.path().join("art.bmp");
        let art =
            generate("HELLO", 1, ECLevel::M, Some(&bg), true, 1.0, 1.0, Some(&out), false).unwrap();
        assert_eq!(art.path(), Some(out.as_path()));
        assert!(out.is_file());
        assert_eq!(art.ec_level(), ECLevel::M);

        let art = generate("HELLO", 1, ECLevel::M, Some(&bg), false, 1.0, 1.0, None, true).unwrap();
        assert!(art.path().is_none());
        assert!(!Path::new("cat_qrcode.png").exists());
    }
}
