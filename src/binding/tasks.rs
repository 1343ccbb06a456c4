// src/binding/tasks.rs
//
// Async task implementations for NAPI.
// `compute` runs on the libuv worker pool with the JS thread free; `resolve`
// builds JS objects back on the JS thread.
//
// Lock order when a task needs several wrappers: encoder, context, image or
// handle. The per-file lock inside the core types comes last and is never held
// while another lock is taken, so a decode racing an encode on the same file
// waits instead of entering libheif concurrently.

use super::context::JsHeifImageHandle;
use super::image::JsHeifImage;
use super::Shared;
use crate::error::{napi_error_with_code, HeifError};
use crate::heif::{DecodeTarget, Encoder, HeifContext, HeifImage, ImageHandle};
use napi::bindgen_prelude::*;
use napi::{Env, Task};

/// Run `op`, remembering a failure so `reject` can build a structured error.
fn track<T>(
    last_error: &mut Option<HeifError>,
    op: impl FnOnce() -> crate::error::Result<T>,
) -> Result<T> {
    op().map_err(|err| {
        *last_error = Some(err.clone());
        napi::Error::from(err)
    })
}

fn structured_reject(env: Env, last_error: &mut Option<HeifError>, err: napi::Error) -> napi::Error {
    match last_error.take() {
        Some(heif_err) => napi_error_with_code(&env, heif_err).unwrap_or(err),
        None => err,
    }
}

pub struct ReadFileTask {
    pub(crate) ctx: Shared<HeifContext>,
    pub(crate) path: String,
    pub(crate) last_error: Option<HeifError>,
}

#[napi]
impl Task for ReadFileTask {
    type Output = ();
    type JsValue = ();

    fn compute(&mut self) -> Result<Self::Output> {
        let (ctx, path) = (&self.ctx, &self.path);
        track(&mut self.last_error, || ctx.lock().read_from_file(path))
    }

    fn resolve(&mut self, _env: Env, output: Self::Output) -> Result<Self::JsValue> {
        Ok(output)
    }

    fn reject(&mut self, env: Env, err: napi::Error) -> Result<Self::JsValue> {
        Err(structured_reject(env, &mut self.last_error, err))
    }
}

pub struct ReadMemoryTask {
    pub(crate) ctx: Shared<HeifContext>,
    /// Moved into the context on first compute.
    pub(crate) data: Option<Vec<u8>>,
    pub(crate) last_error: Option<HeifError>,
}

#[napi]
impl Task for ReadMemoryTask {
    type Output = ();
    type JsValue = ();

    fn compute(&mut self) -> Result<Self::Output> {
        let (ctx, data) = (&self.ctx, self.data.take().unwrap_or_default());
        track(&mut self.last_error, || ctx.lock().read_from_memory(data))
    }

    fn resolve(&mut self, _env: Env, output: Self::Output) -> Result<Self::JsValue> {
        Ok(output)
    }

    fn reject(&mut self, env: Env, err: napi::Error) -> Result<Self::JsValue> {
        Err(structured_reject(env, &mut self.last_error, err))
    }
}

pub struct WriteFileTask {
    pub(crate) ctx: Shared<HeifContext>,
    pub(crate) path: String,
    pub(crate) last_error: Option<HeifError>,
}

#[napi]
impl Task for WriteFileTask {
    type Output = ();
    type JsValue = ();

    fn compute(&mut self) -> Result<Self::Output> {
        let (ctx, path) = (&self.ctx, &self.path);
        track(&mut self.last_error, || ctx.lock().write_to_file(path))
    }

    fn resolve(&mut self, _env: Env, output: Self::Output) -> Result<Self::JsValue> {
        Ok(output)
    }

    fn reject(&mut self, env: Env, err: napi::Error) -> Result<Self::JsValue> {
        Err(structured_reject(env, &mut self.last_error, err))
    }
}

pub struct WriteBytesTask {
    pub(crate) ctx: Shared<HeifContext>,
    pub(crate) last_error: Option<HeifError>,
}

#[napi]
impl Task for WriteBytesTask {
    type Output = Vec<u8>;
    type JsValue = Buffer;

    fn compute(&mut self) -> Result<Self::Output> {
        let ctx = &self.ctx;
        track(&mut self.last_error, || ctx.lock().write_to_bytes())
    }

    fn resolve(&mut self, _env: Env, output: Self::Output) -> Result<Self::JsValue> {
        Ok(output.into())
    }

    fn reject(&mut self, env: Env, err: napi::Error) -> Result<Self::JsValue> {
        Err(structured_reject(env, &mut self.last_error, err))
    }
}

pub struct DecodeTask {
    pub(crate) handle: Shared<ImageHandle>,
    pub(crate) target: DecodeTarget,
    pub(crate) last_error: Option<HeifError>,
}

#[napi]
impl Task for DecodeTask {
    type Output = HeifImage;
    type JsValue = JsHeifImage;

    fn compute(&mut self) -> Result<Self::Output> {
        let (handle, target) = (&self.handle, self.target);
        track(&mut self.last_error, || {
            handle.lock().decode(target.colorspace, target.chroma)
        })
    }

    fn resolve(&mut self, _env: Env, output: Self::Output) -> Result<Self::JsValue> {
        Ok(JsHeifImage::wrap(output))
    }

    fn reject(&mut self, env: Env, err: napi::Error) -> Result<Self::JsValue> {
        Err(structured_reject(env, &mut self.last_error, err))
    }
}

pub struct EncodeTask {
    pub(crate) encoder: Shared<Encoder>,
    pub(crate) ctx: Shared<HeifContext>,
    pub(crate) image: Shared<HeifImage>,
    pub(crate) preset: Option<String>,
    pub(crate) last_error: Option<HeifError>,
}

#[napi]
impl Task for EncodeTask {
    type Output = ImageHandle;
    type JsValue = JsHeifImageHandle;

    fn compute(&mut self) -> Result<Self::Output> {
        let Self {
            encoder,
            ctx,
            image,
            preset,
            last_error,
        } = self;
        track(last_error, || {
            let mut encoder = encoder.lock();
            let mut ctx = ctx.lock();
            let image = image.lock();
            encoder.encode_image(&mut ctx, &image, preset.as_deref())
        })
    }

    fn resolve(&mut self, _env: Env, output: Self::Output) -> Result<Self::JsValue> {
        Ok(JsHeifImageHandle::wrap(output))
    }

    fn reject(&mut self, env: Env, err: napi::Error) -> Result<Self::JsValue> {
        Err(structured_reject(env, &mut self.last_error, err))
    }
}
