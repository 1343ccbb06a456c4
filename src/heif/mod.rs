// src/heif/mod.rs
//
// Safe abstractions for libheif FFI operations.
// Each native object is owned by exactly one RAII wrapper whose Drop calls the
// matching release function once. Raw pointers never leave this module.
#![deny(unsafe_op_in_unsafe_fn)]

mod context;
mod encoder;
mod handle;
mod image;
mod plane;
mod writer;

pub use context::HeifContext;
pub use encoder::{get_encoder_descriptors, Encoder, EncoderDescriptor};
pub use handle::{DecodeTarget, ImageHandle};
pub use image::HeifImage;
pub use plane::{BufferDescriptor, PlaneLayout, PlaneView, PlaneViewMut, SampleFormat};

use crate::enums::CompressionFormat;
use crate::error::{check, HeifError, Result};
use libc::c_int;
use libheif_sys as lh;
use std::ffi::{CStr, CString};
use std::sync::OnceLock;

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed dimension (width or height) for images authored through
/// `HeifImage::new` and `HeifImage::add_plane`.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height) for authored images.
pub const MAX_PIXELS: u64 = 100_000_000;

static LIBRARY: OnceLock<std::result::Result<(), HeifError>> = OnceLock::new();

/// Initialise libheif (plugins, color conversion tables) once per process.
///
/// Every constructor of a native object calls this first. A failed
/// initialisation is remembered and reported to every later caller.
pub(crate) fn ensure_initialized() -> Result<()> {
    LIBRARY
        .get_or_init(|| {
            let result = check(unsafe { lh::heif_init(std::ptr::null_mut()) });
            match &result {
                Ok(()) => tracing::debug!(
                    target: "heif_bridge::init",
                    version = %libheif_version(),
                    "libheif initialised"
                ),
                Err(err) => tracing::warn!(
                    target: "heif_bridge::init",
                    error = %err,
                    "libheif initialisation failed"
                ),
            }
            result
        })
        .clone()
}

/// Version string of the linked libheif (e.g. "1.17.6").
pub fn libheif_version() -> String {
    let ptr = unsafe { lh::heif_get_version() };
    // SAFETY: heif_get_version returns a pointer to a static string or null.
    unsafe { copy_c_str(ptr) }.unwrap_or_default()
}

/// Whether a decoder plugin is registered for `format`.
pub fn has_decoder(format: CompressionFormat) -> bool {
    if ensure_initialized().is_err() {
        return false;
    }
    unsafe { lh::heif_have_decoder_for_format(format.raw() as _) != 0 }
}

/// Whether an encoder plugin is registered for `format`.
pub fn has_encoder(format: CompressionFormat) -> bool {
    if ensure_initialized().is_err() {
        return false;
    }
    unsafe { lh::heif_have_encoder_for_format(format.raw() as _) != 0 }
}

pub(crate) fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(HeifError::invalid_argument(
            "dimensions",
            format!("{width}x{height}"),
            "width and height must be greater than 0",
        ));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(HeifError::invalid_argument(
            "dimensions",
            format!("{width}x{height}"),
            format!("exceeds MAX_DIMENSION {MAX_DIMENSION}"),
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(HeifError::invalid_argument(
            "dimensions",
            format!("{width}x{height}"),
            format!("pixel count {pixels} exceeds MAX_PIXELS {MAX_PIXELS}"),
        ));
    }
    Ok(())
}

pub(crate) fn to_cstring(name: &'static str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| {
        HeifError::invalid_argument(name, value.to_string(), "must not contain NUL bytes")
    })
}

/// Byte length as the `int` libheif expects for metadata payloads.
pub(crate) fn to_c_len(name: &'static str, len: usize) -> Result<c_int> {
    c_int::try_from(len).map_err(|_| {
        HeifError::invalid_argument(name, len.to_string(), "payload is larger than 2 GiB")
    })
}

/// Entries actually written by the fill half of a count/fill pair, capped at
/// the count. A short fill is logged; the caller truncates to it.
pub(crate) fn filled_len(list: &'static str, count: usize, filled: c_int) -> usize {
    let filled = usize::try_from(filled).unwrap_or(0).min(count);
    if filled < count {
        tracing::warn!(
            target: "heif_bridge::enumerate",
            list,
            count,
            filled,
            "fill returned fewer entries than its count"
        );
    }
    filled
}

/// Copy a NUL-terminated native string into an owned `String`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string valid for the
/// duration of this call.
pub(crate) unsafe fn copy_c_str(ptr: *const libc::c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}
