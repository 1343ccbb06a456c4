// src/binding/encoder.rs
//
// HeifEncoder class and the plain descriptor object.

use super::context::JsHeifContext;
use super::image::JsHeifImage;
use super::tasks::EncodeTask;
use super::{shared, Shared};
use crate::enums::CompressionFormat;
use crate::error::HeifError;
use crate::heif::{Encoder, EncoderDescriptor};
use napi::bindgen_prelude::*;

#[napi(object)]
pub struct JsEncoderDescriptor {
    pub id_name: String,
    pub name: String,
    pub compression_format: CompressionFormat,
    pub supports_lossy: bool,
    pub supports_lossless: bool,
}

impl From<EncoderDescriptor> for JsEncoderDescriptor {
    fn from(d: EncoderDescriptor) -> Self {
        Self {
            id_name: d.id_name,
            name: d.name,
            compression_format: d.compression_format,
            supports_lossy: d.supports_lossy,
            supports_lossless: d.supports_lossless,
        }
    }
}

impl From<JsEncoderDescriptor> for EncoderDescriptor {
    fn from(d: JsEncoderDescriptor) -> Self {
        Self {
            id_name: d.id_name,
            name: d.name,
            compression_format: d.compression_format,
            supports_lossy: d.supports_lossy,
            supports_lossless: d.supports_lossless,
        }
    }
}

/// An encoder plugin instance.
///
/// ```js
/// const enc = new HeifEncoder(CompressionFormat.Hevc);
/// enc.setLossyQuality(80);
/// const handle = await enc.encodeImage(ctx, image, 'slow');
/// ```
#[napi(js_name = "HeifEncoder")]
pub struct JsHeifEncoder {
    inner: Shared<Encoder>,
}

#[napi]
impl JsHeifEncoder {
    #[napi(constructor)]
    pub fn new(format: CompressionFormat) -> Result<Self> {
        Ok(Self {
            inner: shared(Encoder::new(format)?),
        })
    }

    #[napi(factory)]
    pub fn from_descriptor(descriptor: JsEncoderDescriptor) -> Result<Self> {
        let descriptor = EncoderDescriptor::from(descriptor);
        Ok(Self {
            inner: shared(Encoder::from_descriptor(&descriptor)?),
        })
    }

    #[napi(getter)]
    pub fn name(&self) -> String {
        self.inner.lock().name()
    }

    #[napi(getter)]
    pub fn compression_format(&self) -> CompressionFormat {
        self.inner.lock().compression_format()
    }

    /// quality: 0-100
    #[napi]
    pub fn set_lossy_quality(&self, quality: u32) -> Result<()> {
        let quality = u8::try_from(quality).map_err(|_| {
            HeifError::invalid_argument(
                "quality",
                quality.to_string(),
                "quality must be between 0 and 100",
            )
        })?;
        Ok(self.inner.lock().set_lossy_quality(quality)?)
    }

    #[napi]
    pub fn set_lossless(&self, lossless: bool) -> Result<()> {
        Ok(self.inner.lock().set_lossless(lossless)?)
    }

    #[napi]
    pub fn set_parameter(&self, name: String, value: String) -> Result<()> {
        Ok(self.inner.lock().set_parameter(&name, &value)?)
    }

    /// Encode `image` into `ctx` on a worker thread. A non-empty `preset`
    /// overrides any "preset" parameter set earlier.
    #[napi(ts_return_type = "Promise<HeifImageHandle>")]
    pub fn encode_image(
        &self,
        ctx: &JsHeifContext,
        image: &JsHeifImage,
        preset: Option<String>,
    ) -> AsyncTask<EncodeTask> {
        AsyncTask::new(EncodeTask {
            encoder: self.inner.clone(),
            ctx: ctx.inner.clone(),
            image: image.inner.clone(),
            preset,
            last_error: None,
        })
    }
}
