// src/binding/context.rs
//
// HeifContext and HeifImageHandle classes.

use super::tasks::{DecodeTask, ReadFileTask, ReadMemoryTask, WriteBytesTask, WriteFileTask};
use super::{shared, Shared};
use crate::enums::{Chroma, Colorspace};
use crate::heif::{DecodeTarget, HeifContext, ImageHandle};
use napi::bindgen_prelude::*;

/// A HEIF file: read it, inspect its images, attach metadata, write it back.
///
/// ```js
/// const ctx = new HeifContext();
/// await ctx.readFromMemory(buffer);
/// const image = await ctx.getPrimaryImageHandle().decode();
/// ```
#[napi(js_name = "HeifContext")]
pub struct JsHeifContext {
    pub(crate) inner: Shared<HeifContext>,
}

#[napi]
impl JsHeifContext {
    #[napi(constructor)]
    pub fn new() -> Result<Self> {
        Ok(Self {
            inner: shared(HeifContext::new()?),
        })
    }

    #[napi(ts_return_type = "Promise<void>")]
    pub fn read_from_file(&self, path: String) -> AsyncTask<ReadFileTask> {
        AsyncTask::new(ReadFileTask {
            ctx: self.inner.clone(),
            path,
            last_error: None,
        })
    }

    /// Parse a HEIF file from a buffer. The bytes are copied once into
    /// native-owned storage that lives as long as the context.
    #[napi(ts_return_type = "Promise<void>")]
    pub fn read_from_memory(&self, data: Buffer) -> AsyncTask<ReadMemoryTask> {
        AsyncTask::new(ReadMemoryTask {
            ctx: self.inner.clone(),
            data: Some(data.to_vec()),
            last_error: None,
        })
    }

    #[napi]
    pub fn get_primary_image_handle(&self) -> Result<JsHeifImageHandle> {
        let handle = self.inner.lock().get_primary_image_handle()?;
        Ok(JsHeifImageHandle::wrap(handle))
    }

    #[napi]
    pub fn get_image_handle(&self, id: u32) -> Result<JsHeifImageHandle> {
        let handle = self.inner.lock().get_image_handle(id)?;
        Ok(JsHeifImageHandle::wrap(handle))
    }

    #[napi(js_name = "getPrimaryImageID")]
    pub fn get_primary_image_id(&self) -> Result<u32> {
        Ok(self.inner.lock().get_primary_image_id()?)
    }

    #[napi(js_name = "isTopLevelImageID")]
    pub fn is_top_level_image_id(&self, id: u32) -> bool {
        self.inner.lock().is_top_level_image_id(id)
    }

    #[napi]
    pub fn number_of_top_level_images(&self) -> u32 {
        self.inner.lock().number_of_top_level_images() as u32
    }

    #[napi(js_name = "getListOfTopLevelImageIDs")]
    pub fn get_list_of_top_level_image_ids(&self) -> Vec<u32> {
        self.inner.lock().get_list_of_top_level_image_ids()
    }

    #[napi(ts_return_type = "Promise<void>")]
    pub fn write_to_file(&self, path: String) -> AsyncTask<WriteFileTask> {
        AsyncTask::new(WriteFileTask {
            ctx: self.inner.clone(),
            path,
            last_error: None,
        })
    }

    #[napi(ts_return_type = "Promise<Buffer>")]
    pub fn write_to_bytes(&self) -> AsyncTask<WriteBytesTask> {
        AsyncTask::new(WriteBytesTask {
            ctx: self.inner.clone(),
            last_error: None,
        })
    }

    #[napi]
    pub fn add_exif_metadata(&self, handle: &JsHeifImageHandle, data: Buffer) -> Result<()> {
        let mut ctx = self.inner.lock();
        let handle = handle.inner.lock();
        Ok(ctx.add_exif_metadata(&handle, &data)?)
    }

    #[napi(js_name = "addXMPMetadata")]
    pub fn add_xmp_metadata(&self, handle: &JsHeifImageHandle, data: Buffer) -> Result<()> {
        let mut ctx = self.inner.lock();
        let handle = handle.inner.lock();
        Ok(ctx.add_xmp_metadata(&handle, &data)?)
    }

    #[napi]
    pub fn add_generic_metadata(
        &self,
        handle: &JsHeifImageHandle,
        data: Buffer,
        item_type: String,
        content_type: Option<String>,
    ) -> Result<()> {
        let mut ctx = self.inner.lock();
        let handle = handle.inner.lock();
        Ok(ctx.add_generic_metadata(&handle, &data, &item_type, content_type.as_deref())?)
    }
}

/// One compressed image in a HeifContext.
#[napi(js_name = "HeifImageHandle")]
pub struct JsHeifImageHandle {
    pub(crate) inner: Shared<ImageHandle>,
}

impl JsHeifImageHandle {
    pub(crate) fn wrap(handle: ImageHandle) -> Self {
        Self {
            inner: shared(handle),
        }
    }
}

#[napi]
impl JsHeifImageHandle {
    #[napi(getter)]
    pub fn width(&self) -> u32 {
        self.inner.lock().width()
    }

    #[napi(getter)]
    pub fn height(&self) -> u32 {
        self.inner.lock().height()
    }

    #[napi(getter)]
    pub fn has_alpha_channel(&self) -> bool {
        self.inner.lock().has_alpha_channel()
    }

    #[napi(getter)]
    pub fn luma_bits_per_pixel(&self) -> Option<u32> {
        self.inner.lock().luma_bits_per_pixel().map(u32::from)
    }

    #[napi(getter)]
    pub fn chroma_bits_per_pixel(&self) -> Option<u32> {
        self.inner.lock().chroma_bits_per_pixel().map(u32::from)
    }

    #[napi(getter)]
    pub fn is_primary(&self) -> bool {
        self.inner.lock().is_primary()
    }

    /// Decode on a worker thread. Defaults to interleaved 8-bit RGB.
    #[napi(ts_return_type = "Promise<HeifImage>")]
    pub fn decode(
        &self,
        colorspace: Option<Colorspace>,
        chroma: Option<Chroma>,
    ) -> AsyncTask<DecodeTask> {
        let defaults = DecodeTarget::default();
        AsyncTask::new(DecodeTask {
            handle: self.inner.clone(),
            target: DecodeTarget {
                colorspace: colorspace.unwrap_or(defaults.colorspace),
                chroma: chroma.unwrap_or(defaults.chroma),
            },
            last_error: None,
        })
    }

    #[napi(js_name = "getListOfMetadataBlockIDs")]
    pub fn get_list_of_metadata_block_ids(&self, type_filter: Option<String>) -> Result<Vec<u32>> {
        Ok(self
            .inner
            .lock()
            .get_list_of_metadata_block_ids(type_filter.as_deref())?)
    }

    #[napi]
    pub fn get_metadata_block_type(&self, id: u32) -> Result<String> {
        Ok(self.inner.lock().get_metadata_block_type(id)?)
    }

    #[napi]
    pub fn get_metadata_block_content_type(&self, id: u32) -> Result<Option<String>> {
        Ok(self.inner.lock().get_metadata_block_content_type(id)?)
    }

    #[napi]
    pub fn get_metadata_block(&self, id: u32) -> Result<Buffer> {
        Ok(self.inner.lock().get_metadata_block(id)?.into())
    }
}
