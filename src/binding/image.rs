// src/binding/image.rs
//
// HeifImage and HeifPlane classes.
//
// A HeifPlane keeps its image alive through a shared reference. `data()`
// hands JS an external buffer over the native plane; its finalizer owns
// another reference, so the pixels outlive both the plane and the image
// object for as long as JS holds the buffer. `read`/`write` copy.

use super::{shared, Shared};
use crate::enums::{Channel, Chroma, Colorspace};
use crate::error::HeifError;
use crate::heif::{HeifImage, PlaneLayout};
use napi::bindgen_prelude::*;
use napi::Env;
use std::sync::Arc;

/// Address and length of a plane's native bytes, row padding included.
fn plane_bytes(
    image: &mut HeifImage,
    channel: Channel,
    writeable: bool,
) -> crate::error::Result<(*mut u8, usize)> {
    if writeable {
        let mut view = image.plane_mut(channel)?;
        let data = view.data_mut();
        Ok((data.as_mut_ptr(), data.len()))
    } else {
        let data = image.plane(channel)?.data();
        Ok((data.as_ptr().cast_mut(), data.len()))
    }
}

/// Plane geometry as a JS number; planes beyond u32 are reported, not cut.
fn to_js_size(name: &'static str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        HeifError::invalid_argument(name, value.to_string(), "plane too large for JS")
            .into()
    })
}

/// Buffer layout of a plane as seen by typed-array consumers.
#[derive(Debug)]
#[napi(object)]
pub struct JsPlaneDescriptor {
    /// Bytes per element (1 or 2).
    pub item_size: u32,
    /// "uint8" or "uint16".
    pub format: String,
    pub ndim: u32,
    pub shape: Vec<u32>,
    /// Byte strides matching `shape`; the first one includes row padding.
    pub strides: Vec<u32>,
    pub readonly: bool,
    /// Total byte length returned by `read()`.
    pub byte_length: u32,
}

impl JsPlaneDescriptor {
    pub fn new(layout: &PlaneLayout, readonly: bool) -> Result<Self> {
        let to_u32 = |name, values: Vec<usize>| {
            values
                .into_iter()
                .map(|v| to_js_size(name, v))
                .collect::<Result<Vec<u32>>>()
        };
        Ok(Self {
            item_size: to_js_size("item_size", layout.element_bytes())?,
            format: layout.sample_format().as_str().to_string(),
            ndim: to_js_size("ndim", layout.ndim())?,
            shape: to_u32("shape", layout.shape())?,
            strides: to_u32("strides", layout.strides())?,
            readonly,
            byte_length: to_js_size("byte_length", layout.byte_len())?,
        })
    }
}

/// Decoded (or authored) pixel data.
#[napi(js_name = "HeifImage")]
pub struct JsHeifImage {
    pub(crate) inner: Shared<HeifImage>,
}

impl JsHeifImage {
    pub(crate) fn wrap(image: HeifImage) -> Self {
        Self {
            inner: shared(image),
        }
    }
}

#[napi]
impl JsHeifImage {
    /// Create an empty image to fill with `addPlane` before encoding.
    #[napi(constructor)]
    pub fn new(width: u32, height: u32, colorspace: Colorspace, chroma: Chroma) -> Result<Self> {
        Ok(Self::wrap(HeifImage::new(width, height, colorspace, chroma)?))
    }

    #[napi]
    pub fn add_plane(&self, channel: Channel, width: u32, height: u32, bit_depth: u32) -> Result<()> {
        let bit_depth = u8::try_from(bit_depth).map_err(|_| {
            HeifError::invalid_argument("bit_depth", bit_depth.to_string(), "must be 1..=16")
        })?;
        Ok(self
            .inner
            .lock()
            .add_plane(channel, width, height, bit_depth)?)
    }

    #[napi]
    pub fn has_channel(&self, channel: Channel) -> bool {
        self.inner.lock().has_channel(channel)
    }

    #[napi]
    pub fn get_width(&self, channel: Channel) -> Option<u32> {
        self.inner.lock().width(channel)
    }

    #[napi]
    pub fn get_height(&self, channel: Channel) -> Option<u32> {
        self.inner.lock().height(channel)
    }

    #[napi(getter)]
    pub fn colorspace(&self) -> Colorspace {
        self.inner.lock().colorspace()
    }

    #[napi(getter)]
    pub fn chroma(&self) -> Chroma {
        self.inner.lock().chroma_format()
    }

    #[napi]
    pub fn get_bits_per_pixel_range(&self, channel: Channel) -> Option<u32> {
        self.inner.lock().bits_per_pixel_range(channel).map(u32::from)
    }

    /// View of one channel's plane. `writeable` defaults to false.
    #[napi]
    pub fn get_plane(&self, channel: Channel, writeable: Option<bool>) -> Result<JsHeifPlane> {
        let writeable = writeable.unwrap_or(false);
        let mut image = self.inner.lock();
        let layout = if writeable {
            *image.plane_mut(channel)?.layout()
        } else {
            *image.plane(channel)?.layout()
        };
        drop(image);
        Ok(JsHeifPlane {
            image: self.inner.clone(),
            channel,
            writeable,
            layout,
        })
    }
}

/// One plane of a HeifImage.
#[napi(js_name = "HeifPlane")]
pub struct JsHeifPlane {
    image: Shared<HeifImage>,
    channel: Channel,
    writeable: bool,
    layout: PlaneLayout,
}

#[napi]
impl JsHeifPlane {
    #[napi(getter)]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    #[napi(getter)]
    pub fn writeable(&self) -> bool {
        self.writeable
    }

    #[napi(getter)]
    pub fn width(&self) -> Result<u32> {
        to_js_size("width", self.layout.width())
    }

    #[napi(getter)]
    pub fn height(&self) -> Result<u32> {
        to_js_size("height", self.layout.height())
    }

    #[napi(getter)]
    pub fn stride(&self) -> Result<u32> {
        to_js_size("stride", self.layout.stride())
    }

    #[napi(getter)]
    pub fn descriptor(&self) -> Result<JsPlaneDescriptor> {
        JsPlaneDescriptor::new(&self.layout, !self.writeable)
    }

    /// The native plane bytes without copying, row padding included. Walk it
    /// with `descriptor.strides`. Writes through a buffer from a writeable
    /// plane land in the image directly.
    #[napi]
    pub fn data<'env>(&self, env: &'env Env) -> Result<BufferSlice<'env>> {
        let (ptr, len) = plane_bytes(&mut self.image.lock(), self.channel, self.writeable)?;
        let keepalive = Arc::clone(&self.image);
        // SAFETY: the plane memory belongs to the HeifImage; the finalize
        // hint holds a reference to it until V8 releases the buffer.
        unsafe {
            BufferSlice::from_external(env, ptr, len, keepalive, |_env, image| drop(image))
        }
    }

    /// Copy of the plane bytes, row padding included.
    #[napi]
    pub fn read(&self) -> Result<Buffer> {
        let image = self.image.lock();
        let view = image.plane(self.channel)?;
        Ok(view.data().to_vec().into())
    }

    /// Overwrite the plane. Accepts either tightly packed rows or the full
    /// padded layout reported by `descriptor.byteLength`.
    #[napi]
    pub fn write(&self, data: Buffer) -> Result<()> {
        if !self.writeable {
            return Err(HeifError::invalid_argument(
                "plane",
                self.channel.to_string(),
                "plane view is read-only",
            )
            .into());
        }
        let mut image = self.image.lock();
        let mut view = image.plane_mut(self.channel)?;
        if data.len() == view.layout().byte_len() {
            view.data_mut().copy_from_slice(&data);
            Ok(())
        } else {
            Ok(view.copy_from_packed(&data)?)
        }
    }
}
