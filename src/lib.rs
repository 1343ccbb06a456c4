// lib.rs
//
// heif-bridge: safe, zero-copy bindings to libheif for Rust and Node.js
//
// Design goals:
// - Every native object released exactly once
// - Pixel planes exposed without copying, with their real stride
// - libheif errors surfaced verbatim (code, subcode, message)
// - Decode/encode/I-O off the JS thread

#[cfg(feature = "napi")]
#[macro_use]
extern crate napi_derive;

// Memory allocator optimization - jemalloc for better performance
// Note: jemalloc is not supported on Windows/MSVC, so we exclude it on that platform
#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub mod enums;
pub mod error;
pub mod heif;

#[cfg(feature = "napi")]
pub mod binding;

pub use enums::{Channel, Chroma, Colorspace, CompressionFormat, HeifErrorCode, HeifSuberrorCode};
pub use error::{check, ErrorCategory, HeifError, Result};
pub use heif::{
    get_encoder_descriptors, has_decoder, has_encoder, libheif_version, BufferDescriptor,
    DecodeTarget, Encoder, EncoderDescriptor, HeifContext, HeifImage, ImageHandle, PlaneLayout,
    PlaneView, PlaneViewMut, SampleFormat, MAX_DIMENSION, MAX_PIXELS,
};

/// Version of this crate.
#[cfg_attr(feature = "napi", napi)]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
