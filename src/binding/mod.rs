// src/binding/mod.rs
//
// Node.js surface for heif-bridge.
//
// Native wrappers are shared as `Arc<Mutex<_>>`: a JS object and any
// in-flight AsyncTask hold the same wrapper, and the mutex serialises calls on
// one native object. Handles and their context additionally share the core
// per-file lock, which covers calls that reach one file through different
// wrappers. Long-running calls return AsyncTasks whose `compute`
// runs on the libuv worker pool, off the JS thread.

mod context;
mod encoder;
mod image;
mod tasks;

pub use context::{JsHeifContext, JsHeifImageHandle};
pub use encoder::{JsEncoderDescriptor, JsHeifEncoder};
pub use image::{JsHeifImage, JsHeifPlane, JsPlaneDescriptor};
pub use tasks::{DecodeTask, EncodeTask, ReadFileTask, ReadMemoryTask, WriteBytesTask, WriteFileTask};

use crate::enums::CompressionFormat;
use crate::heif;
use napi::bindgen_prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;

pub(crate) type Shared<T> = Arc<Mutex<T>>;

pub(crate) fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Available encoder plugins, optionally filtered by format and/or name.
#[napi(js_name = "getEncoderDescriptors")]
pub fn get_encoder_descriptors(
    format: Option<CompressionFormat>,
    name: Option<String>,
) -> Result<Vec<JsEncoderDescriptor>> {
    let descriptors = heif::get_encoder_descriptors(format, name.as_deref())?;
    Ok(descriptors.into_iter().map(JsEncoderDescriptor::from).collect())
}

#[napi(js_name = "hasDecoder")]
pub fn has_decoder(format: CompressionFormat) -> bool {
    heif::has_decoder(format)
}

#[napi(js_name = "hasEncoder")]
pub fn has_encoder(format: CompressionFormat) -> bool {
    heif::has_encoder(format)
}

/// Version of the linked libheif.
#[napi(js_name = "libheifVersion")]
pub fn libheif_version() -> String {
    heif::libheif_version()
}
