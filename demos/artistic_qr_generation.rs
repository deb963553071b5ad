use std::env;
use std::error::Error;

use artqr::{ArtQRBuilder, ECLevel, Quantize};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let text = args.next().unwrap_or_else(|| "https://github.com".to_string());
    let background = args.next();

    let mut builder = ArtQRBuilder::new(&text);
    builder
        .version(5)                   // Smallest version to try - grows until the text fits
        .ec_level(ECLevel::H)         // Error correction level - defaults to ECLevel::H
        .contrast(1.2)                // Enhancement factors - 1.0 leaves the picture untouched
        .brightness(1.1)
        .quantize(Quantize::Dither)   // 1-bit output only - defaults to Quantize::Dither
        .scale(4);                    // Nearest-neighbour upscale - defaults to 3

    if let Some(bg) = &background {
        builder.background(bg).colorized(true);
    }

    let art = builder.build()?;

    match art.path() {
        Some(p) => println!("Artistic QR code saved to: {}", p.display()),
        None => println!("Artistic QR code kept in memory"),
    }
    println!("Version: {}, Ec level: {}", art.version(), art.ec_level());
    println!("Base64 payload: {} chars", art.base64().len());

    Ok(())
}
