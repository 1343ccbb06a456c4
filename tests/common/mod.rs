// tests/common/mod.rs
//
// Fixtures shared by the integration tests.
#![allow(dead_code)]

use heif_bridge::{
    has_decoder, has_encoder, Channel, Chroma, Colorspace, CompressionFormat, Encoder,
    HeifContext, HeifImage,
};
use image::RgbImage;

/// Route library events at DEBUG and above to the test harness output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// First format with both an encoder and a decoder plugin, if any.
pub fn round_trip_format() -> Option<CompressionFormat> {
    [
        CompressionFormat::Hevc,
        CompressionFormat::Av1,
        CompressionFormat::Jpeg,
        CompressionFormat::Jpeg2000,
    ]
    .into_iter()
    .find(|&format| has_encoder(format) && has_decoder(format))
}

/// Early-return guard for tests that need a codec plugin.
macro_rules! require_codec {
    () => {{
        common::init_tracing();
        match common::round_trip_format() {
            Some(format) => format,
            None => {
                eprintln!("skipping: libheif has no encoder/decoder pair");
                return;
            }
        }
    }};
}

pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Copy an RGB buffer into a freshly authored interleaved HeifImage.
pub fn heif_from_rgb(rgb: &RgbImage) -> HeifImage {
    let (w, h) = rgb.dimensions();
    let mut image = HeifImage::new(w, h, Colorspace::Rgb, Chroma::InterleavedRgb).unwrap();
    image.add_plane(Channel::Interleaved, w, h, 8).unwrap();
    image
        .plane_mut(Channel::Interleaved)
        .unwrap()
        .copy_from_packed(rgb.as_raw())
        .unwrap();
    image
}

/// Encode a gradient of the given size and return the serialised file.
pub fn encoded_gradient(format: CompressionFormat, width: u32, height: u32) -> Vec<u8> {
    let mut ctx = HeifContext::new().unwrap();
    let mut encoder = Encoder::new(format).unwrap();
    encoder.set_lossy_quality(90).unwrap();
    let image = heif_from_rgb(&gradient(width, height));
    encoder.encode_image(&mut ctx, &image, None).unwrap();
    ctx.write_to_bytes().unwrap()
}
