// src/heif/handle.rs
//
// ImageHandle: one compressed image inside a container, plus the metadata
// blocks attached to it.

use super::context::FileShare;
use super::image::HeifImage;
use super::{copy_c_str, filled_len, to_cstring};
use crate::enums::{Chroma, Colorspace};
use crate::error::{check, HeifError, Result};
use libc::c_int;
use libheif_sys as lh;
use std::ffi::CString;
use std::ptr::NonNull;
use std::sync::Arc;

/// Colorspace and chroma requested from the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTarget {
    pub colorspace: Colorspace,
    pub chroma: Chroma,
}

impl Default for DecodeTarget {
    fn default() -> Self {
        Self {
            colorspace: Colorspace::Rgb,
            chroma: Chroma::InterleavedRgb,
        }
    }
}

/// Owned heif_image_handle.
///
/// libheif handles read the same parsed file as the context that produced
/// them, so every native call here takes that file's lock first. The file
/// state also keeps memory-backed input alive after the context is gone.
pub struct ImageHandle {
    ptr: NonNull<lh::heif_image_handle>,
    file: Arc<FileShare>,
}

// SAFETY: a handle has no thread affinity; concurrent access to the file it
// shares with its context and sibling handles is serialised by `FileShare`.
unsafe impl Send for ImageHandle {}

impl ImageHandle {
    pub(crate) fn from_raw(ptr: *mut lh::heif_image_handle, file: Arc<FileShare>) -> Result<Self> {
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            HeifError::native(
                crate::enums::HeifErrorCode::InvalidInput,
                crate::enums::HeifSuberrorCode::NonexistingItemReferenced,
                "libheif returned no image handle",
            )
        })?;
        #[cfg(test)]
        super::tracking::acquired(&super::tracking::LIVE_HANDLES);
        Ok(Self { ptr, file })
    }

    pub(crate) fn as_ptr(&self) -> *mut lh::heif_image_handle {
        self.ptr.as_ptr()
    }

    pub(crate) fn share(&self) -> &Arc<FileShare> {
        &self.file
    }

    pub fn width(&self) -> u32 {
        let _file = self.file.lock();
        let width = unsafe { lh::heif_image_handle_get_width(self.as_ptr()) };
        u32::try_from(width).unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        let _file = self.file.lock();
        let height = unsafe { lh::heif_image_handle_get_height(self.as_ptr()) };
        u32::try_from(height).unwrap_or(0)
    }

    pub fn has_alpha_channel(&self) -> bool {
        let _file = self.file.lock();
        unsafe { lh::heif_image_handle_has_alpha_channel(self.as_ptr()) != 0 }
    }

    /// Bit depth of the luma channel, `None` when libheif cannot tell.
    pub fn luma_bits_per_pixel(&self) -> Option<u8> {
        let _file = self.file.lock();
        let bits = unsafe { lh::heif_image_handle_get_luma_bits_per_pixel(self.as_ptr()) };
        u8::try_from(bits).ok()
    }

    pub fn chroma_bits_per_pixel(&self) -> Option<u8> {
        let _file = self.file.lock();
        let bits = unsafe { lh::heif_image_handle_get_chroma_bits_per_pixel(self.as_ptr()) };
        u8::try_from(bits).ok()
    }

    pub fn is_primary(&self) -> bool {
        let _file = self.file.lock();
        unsafe { lh::heif_image_handle_is_primary_image(self.as_ptr()) != 0 }
    }

    /// Decode the image into the requested colorspace and chroma layout.
    #[tracing::instrument(
        skip_all,
        fields(width = self.width(), height = self.height(), ?colorspace, ?chroma)
    )]
    pub fn decode(&self, colorspace: Colorspace, chroma: Chroma) -> Result<HeifImage> {
        let mut image = std::ptr::null_mut();
        let file = self.file.lock();
        check(unsafe {
            lh::heif_decode_image(
                self.as_ptr(),
                &mut image,
                colorspace.raw() as _,
                chroma.raw() as _,
                std::ptr::null(),
            )
        })?;
        drop(file);
        tracing::debug!(target: "heif_bridge::handle", "image decoded");
        HeifImage::from_raw(image)
    }

    /// Ids of metadata blocks, optionally restricted to one item type
    /// ("Exif", "mime", ...). An empty filter means no filter.
    pub fn get_list_of_metadata_block_ids(&self, type_filter: Option<&str>) -> Result<Vec<u32>> {
        let filter: Option<CString> = type_filter
            .filter(|value| !value.is_empty())
            .map(|value| to_cstring("type_filter", value))
            .transpose()?;
        let filter_ptr = filter.as_ref().map_or(std::ptr::null(), |f| f.as_ptr());

        // Count and fill under one lock so the two calls see the same file.
        let _file = self.file.lock();
        let count =
            unsafe { lh::heif_image_handle_get_number_of_metadata_blocks(self.as_ptr(), filter_ptr) };
        let Ok(count) = usize::try_from(count) else {
            return Ok(Vec::new());
        };
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut ids = vec![0u32; count];
        let filled = unsafe {
            lh::heif_image_handle_get_list_of_metadata_block_IDs(
                self.as_ptr(),
                filter_ptr,
                ids.as_mut_ptr(),
                c_int::try_from(count).unwrap_or(c_int::MAX),
            )
        };
        ids.truncate(filled_len("metadata blocks", count, filled));
        tracing::trace!(
            target: "heif_bridge::handle",
            filter = type_filter.unwrap_or(""),
            count = ids.len(),
            "listed metadata blocks"
        );
        Ok(ids)
    }

    /// Item type of a metadata block ("Exif", "mime", "uri ").
    pub fn get_metadata_block_type(&self, id: u32) -> Result<String> {
        let _file = self.file.lock();
        self.metadata_type(id)
    }

    fn metadata_type(&self, id: u32) -> Result<String> {
        let ptr = unsafe { lh::heif_image_handle_get_metadata_type(self.as_ptr(), id) };
        // SAFETY: libheif returns a string owned by the handle, or null.
        unsafe { copy_c_str(ptr) }.ok_or_else(|| HeifError::metadata_not_found(id))
    }

    /// Content type of a generic block; `None` when the block has none.
    pub fn get_metadata_block_content_type(&self, id: u32) -> Result<Option<String>> {
        // Unknown ids and blocks without a content type both come back empty
        // from libheif, so resolve the id first.
        let _file = self.file.lock();
        self.metadata_type(id)?;
        let ptr = unsafe { lh::heif_image_handle_get_metadata_content_type(self.as_ptr(), id) };
        Ok(unsafe { copy_c_str(ptr) }.filter(|value| !value.is_empty()))
    }

    /// Raw bytes of a metadata block. Exif blocks keep libheif's 4-byte
    /// TIFF header offset prefix.
    pub fn get_metadata_block(&self, id: u32) -> Result<Vec<u8>> {
        // Size query and fill under one lock.
        let _file = self.file.lock();
        self.metadata_type(id)?;
        let size = unsafe { lh::heif_image_handle_get_metadata_size(self.as_ptr(), id) };
        let mut data = vec![0u8; size];
        if size > 0 {
            check(unsafe {
                lh::heif_image_handle_get_metadata(self.as_ptr(), id, data.as_mut_ptr().cast())
            })?;
        }
        tracing::trace!(target: "heif_bridge::handle", id, size, "metadata block read");
        Ok(data)
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        {
            let _file = self.file.lock();
            unsafe { lh::heif_image_handle_release(self.ptr.as_ptr()) };
        }
        #[cfg(test)]
        super::tracking::released(&super::tracking::LIVE_HANDLES);
    }
}

impl std::fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHandle")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{Channel, HeifErrorCode};
    use crate::heif::test_support::{gradient_rgb, round_trip_format};
    use crate::heif::tracking::{self, LIVE_HANDLES, LIVE_IMAGES};
    use crate::heif::{Encoder, HeifContext};

    fn encoded_handle(ctx: &mut HeifContext, width: u32, height: u32) -> Option<ImageHandle> {
        let format = round_trip_format()?;
        let mut encoder = Encoder::new(format).unwrap();
        let image = gradient_rgb(width, height);
        Some(encoder.encode_image(ctx, &image, None).unwrap())
    }

    #[test]
    fn decode_target_defaults_to_interleaved_rgb() {
        let target = DecodeTarget::default();
        assert_eq!(target.colorspace, Colorspace::Rgb);
        assert_eq!(target.chroma, Chroma::InterleavedRgb);
    }

    #[test]
    fn geometry_and_decode() {
        let mut ctx = HeifContext::new().unwrap();
        let Some(handle) = encoded_handle(&mut ctx, 40, 30) else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        assert_eq!((handle.width(), handle.height()), (40, 30));
        assert!(!handle.has_alpha_channel());
        assert_eq!(handle.luma_bits_per_pixel(), Some(8));

        let decoded = handle.decode(Colorspace::Rgb, Chroma::InterleavedRgb).unwrap();
        assert_eq!(decoded.width(Channel::Interleaved), Some(40));
        assert_eq!(decoded.height(Channel::Interleaved), Some(30));
    }

    #[test]
    fn unknown_metadata_id_is_invalid_input() {
        let mut ctx = HeifContext::new().unwrap();
        let Some(handle) = encoded_handle(&mut ctx, 8, 8) else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        assert!(handle.get_list_of_metadata_block_ids(None).unwrap().is_empty());

        let err = handle.get_metadata_block(9999).unwrap_err();
        assert_eq!(err, HeifError::metadata_not_found(9999));
        assert_eq!(err.code(), Some(HeifErrorCode::InvalidInput));
        assert!(handle.get_metadata_block_type(9999).is_err());
        assert!(handle.get_metadata_block_content_type(9999).is_err());
    }

    #[test]
    fn metadata_filter_and_content_type() {
        let mut ctx = HeifContext::new().unwrap();
        let Some(handle) = encoded_handle(&mut ctx, 8, 8) else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        ctx.add_xmp_metadata(&handle, b"<x:xmpmeta/>").unwrap();
        ctx.add_generic_metadata(&handle, b"{}", "mime", Some("application/json"))
            .unwrap();

        let bytes = ctx.write_to_bytes().unwrap();
        let mut reread = HeifContext::new().unwrap();
        reread.read_from_memory(bytes).unwrap();
        let handle = reread.get_primary_image_handle().unwrap();

        let all = handle.get_list_of_metadata_block_ids(Some("")).unwrap();
        let mime = handle.get_list_of_metadata_block_ids(Some("mime")).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(mime.len(), 2);

        let json_blocks: Vec<u32> = mime
            .iter()
            .copied()
            .filter(|&id| {
                handle.get_metadata_block_content_type(id).unwrap().as_deref()
                    == Some("application/json")
            })
            .collect();
        assert_eq!(json_blocks.len(), 1);
        assert_eq!(handle.get_metadata_block(json_blocks[0]).unwrap(), b"{}");
    }

    #[test]
    fn handles_and_images_are_released_once() {
        let _guard = tracking::enable();
        {
            let mut ctx = HeifContext::new().unwrap();
            let Some(handle) = encoded_handle(&mut ctx, 8, 8) else {
                eprintln!("skipping: no libheif encoder/decoder pair available");
                return;
            };
            let _image = handle.decode(Colorspace::Rgb, Chroma::InterleavedRgb).unwrap();
            assert_eq!(tracking::live(&LIVE_HANDLES), 1);
            assert_eq!(tracking::live(&LIVE_IMAGES), 1);
        }
        assert_eq!(tracking::live(&LIVE_HANDLES), 0);
        assert_eq!(tracking::live(&LIVE_IMAGES), 0);
    }
}
