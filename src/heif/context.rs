// src/heif/context.rs
//
// Container: one owned heif_context plus the file state it shares with every
// handle it hands out. libheif handles point back into the same parsed file as
// their context, so all native calls on that file go through one lock, and
// bytes read from memory live as long as the last of them.

use super::handle::ImageHandle;
use super::{ensure_initialized, filled_len, to_c_len, to_cstring, writer};
use crate::enums::{HeifErrorCode, HeifSuberrorCode};
use crate::error::{check, HeifError, Result};
use libc::c_int;
use libheif_sys as lh;
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::{Arc, OnceLock};

/// State of one parsed file, shared by its context and all of its handles.
#[derive(Default)]
pub(crate) struct FileShare {
    lock: Mutex<()>,
    memory: OnceLock<Vec<u8>>,
}

impl FileShare {
    /// Held across every native call that reads or mutates the file.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }
}

/// Owned libheif file context.
///
/// Handles obtained from a context keep working after it moves to another
/// thread or is dropped. Calls on the context and on any of its handles are
/// serialised on a per-file lock, so a handle decoding on one thread never
/// overlaps with metadata being added on another.
pub struct HeifContext {
    ptr: NonNull<lh::heif_context>,
    file: Arc<FileShare>,
}

// SAFETY: a heif_context has no thread affinity. Exclusive use of `ptr` comes
// from `&mut self` / !Sync, and native access shared with handles goes
// through `FileShare::lock`.
unsafe impl Send for HeifContext {}

impl HeifContext {
    /// Allocate an empty context, initialising libheif on first use.
    pub fn new() -> Result<Self> {
        ensure_initialized()?;
        let ptr = NonNull::new(unsafe { lh::heif_context_alloc() }).ok_or_else(|| {
            HeifError::native(
                HeifErrorCode::MemoryAllocationError,
                HeifSuberrorCode::Unspecified,
                "Failed to allocate heif context",
            )
        })?;
        #[cfg(test)]
        super::tracking::acquired(&super::tracking::LIVE_CONTEXTS);
        tracing::debug!(target: "heif_bridge::context", "context allocated");
        Ok(Self {
            ptr,
            file: Arc::default(),
        })
    }

    pub(crate) fn as_ptr(&self) -> *mut lh::heif_context {
        self.ptr.as_ptr()
    }

    /// File state handed to every handle produced by this context.
    pub(crate) fn share(&self) -> Arc<FileShare> {
        Arc::clone(&self.file)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.file.lock()
    }

    /// Metadata may only be attached through handles of this same file.
    fn owns(&self, handle: &ImageHandle) -> Result<()> {
        if Arc::ptr_eq(&self.file, handle.share()) {
            Ok(())
        } else {
            Err(HeifError::invalid_argument(
                "handle",
                format!("{handle:?}"),
                "handle belongs to a different context",
            ))
        }
    }

    /// Parse a HEIF file from disk.
    pub fn read_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let path_str = path.to_str().ok_or_else(|| {
            HeifError::invalid_argument(
                "path",
                path.display().to_string(),
                "path is not valid UTF-8",
            )
        })?;
        let c_path = to_cstring("path", path_str)?;
        tracing::debug!(target: "heif_bridge::context", path = path_str, "reading file");
        let _file = self.lock();
        check(unsafe {
            lh::heif_context_read_from_file(self.as_ptr(), c_path.as_ptr(), std::ptr::null())
        })
    }

    /// Parse a HEIF file held in memory without copying it.
    ///
    /// Allowed once per context. The bytes are moved into the context before
    /// libheif sees them and stay attached even when parsing fails, since
    /// libheif may already reference them.
    pub fn read_from_memory(&mut self, data: impl Into<Vec<u8>>) -> Result<()> {
        if self.file.memory.get().is_some() {
            return Err(HeifError::already_initialized());
        }
        let stored = self.file.memory.get_or_init(|| data.into());
        let (ptr, len) = (stored.as_ptr(), stored.len());
        tracing::debug!(target: "heif_bridge::context", bytes = len, "reading memory");
        let _file = self.file.lock();
        check(unsafe {
            lh::heif_context_read_from_memory_without_copy(
                self.ptr.as_ptr(),
                ptr.cast(),
                len,
                std::ptr::null(),
            )
        })
    }

    pub fn get_primary_image_handle(&self) -> Result<ImageHandle> {
        let mut handle = std::ptr::null_mut();
        {
            let _file = self.lock();
            check(unsafe {
                lh::heif_context_get_primary_image_handle(self.as_ptr(), &mut handle)
            })?;
        }
        ImageHandle::from_raw(handle, self.share())
    }

    pub fn get_image_handle(&self, id: u32) -> Result<ImageHandle> {
        let mut handle = std::ptr::null_mut();
        {
            let _file = self.lock();
            check(unsafe { lh::heif_context_get_image_handle(self.as_ptr(), id, &mut handle) })?;
        }
        ImageHandle::from_raw(handle, self.share())
    }

    pub fn get_primary_image_id(&self) -> Result<u32> {
        let mut id = 0;
        let _file = self.lock();
        check(unsafe { lh::heif_context_get_primary_image_ID(self.as_ptr(), &mut id) })?;
        Ok(id)
    }

    pub fn is_top_level_image_id(&self, id: u32) -> bool {
        let _file = self.lock();
        unsafe { lh::heif_context_is_top_level_image_ID(self.as_ptr(), id) != 0 }
    }

    pub fn number_of_top_level_images(&self) -> usize {
        let _file = self.lock();
        self.top_level_count()
    }

    fn top_level_count(&self) -> usize {
        let count = unsafe { lh::heif_context_get_number_of_top_level_images(self.as_ptr()) };
        usize::try_from(count).unwrap_or(0)
    }

    /// Ids of all top-level images, in file order.
    pub fn get_list_of_top_level_image_ids(&self) -> Vec<u32> {
        // Count and fill under one lock so the two calls see the same file.
        let _file = self.lock();
        let count = self.top_level_count();
        if count == 0 {
            return Vec::new();
        }
        let mut ids = vec![0u32; count];
        let filled = unsafe {
            lh::heif_context_get_list_of_top_level_image_IDs(
                self.as_ptr(),
                ids.as_mut_ptr(),
                c_int::try_from(count).unwrap_or(c_int::MAX),
            )
        };
        ids.truncate(filled_len("top-level images", count, filled));
        tracing::trace!(
            target: "heif_bridge::context",
            count,
            filled = ids.len(),
            "listed top-level images"
        );
        ids
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let path_str = path.to_str().ok_or_else(|| {
            HeifError::invalid_argument(
                "path",
                path.display().to_string(),
                "path is not valid UTF-8",
            )
        })?;
        let c_path = to_cstring("path", path_str)?;
        {
            let _file = self.lock();
            check(unsafe { lh::heif_context_write_to_file(self.as_ptr(), c_path.as_ptr()) })?;
        }
        tracing::debug!(target: "heif_bridge::context", path = path_str, "container written");
        Ok(())
    }

    /// Serialise the whole container into a new byte vector.
    pub fn write_to_bytes(&self) -> Result<Vec<u8>> {
        let _file = self.lock();
        writer::write_context(self.ptr)
    }

    /// Attach an Exif block. `data` starts at the TIFF header ("II*\0" or
    /// "MM\0*"); libheif prepends the header offset when storing it.
    pub fn add_exif_metadata(&mut self, handle: &ImageHandle, data: &[u8]) -> Result<()> {
        self.owns(handle)?;
        let len = to_c_len("exif", data.len())?;
        let _file = self.lock();
        check(unsafe {
            lh::heif_context_add_exif_metadata(
                self.as_ptr(),
                handle.as_ptr(),
                data.as_ptr().cast(),
                len,
            )
        })
    }

    pub fn add_xmp_metadata(&mut self, handle: &ImageHandle, data: &[u8]) -> Result<()> {
        self.owns(handle)?;
        let len = to_c_len("xmp", data.len())?;
        let _file = self.lock();
        check(unsafe {
            lh::heif_context_add_XMP_metadata(
                self.as_ptr(),
                handle.as_ptr(),
                data.as_ptr().cast(),
                len,
            )
        })
    }

    /// Attach an arbitrary metadata item. Without `content_type` no content
    /// type is passed to libheif at all.
    pub fn add_generic_metadata(
        &mut self,
        handle: &ImageHandle,
        data: &[u8],
        item_type: &str,
        content_type: Option<&str>,
    ) -> Result<()> {
        let len = to_c_len("metadata", data.len())?;
        let c_item_type = to_cstring("item_type", item_type)?;
        let c_content_type = content_type
            .map(|value| to_cstring("content_type", value))
            .transpose()?;
        self.owns(handle)?;
        let _file = self.lock();
        check(unsafe {
            lh::heif_context_add_generic_metadata(
                self.as_ptr(),
                handle.as_ptr(),
                data.as_ptr().cast(),
                len,
                c_item_type.as_ptr(),
                c_content_type
                    .as_ref()
                    .map_or(std::ptr::null(), |value| value.as_ptr()),
            )
        })
    }
}

impl Drop for HeifContext {
    fn drop(&mut self) {
        {
            let _file = self.file.lock();
            unsafe { lh::heif_context_free(self.ptr.as_ptr()) };
        }
        #[cfg(test)]
        super::tracking::released(&super::tracking::LIVE_CONTEXTS);
        tracing::debug!(target: "heif_bridge::context", "context released");
    }
}

impl std::fmt::Debug for HeifContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeifContext")
            .field("memory_bytes", &self.file.memory.get().map(Vec::len))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heif::test_support::{encoded_bytes, round_trip_format};
    use crate::heif::DecodeTarget;
    use crate::heif::tracking::{self, LIVE_CONTEXTS, LIVE_HANDLES};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn context_is_released_once() {
        let _guard = tracking::enable();
        {
            let _ctx = HeifContext::new().unwrap();
            assert_eq!(tracking::live(&LIVE_CONTEXTS), 1);
        }
        assert_eq!(tracking::live(&LIVE_CONTEXTS), 0);
    }

    #[test]
    fn context_is_released_on_unwind() {
        let _guard = tracking::enable();
        let result = std::panic::catch_unwind(|| {
            let _ctx = HeifContext::new().unwrap();
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(tracking::live(&LIVE_CONTEXTS), 0);
    }

    #[test]
    fn garbage_input_is_rejected() {
        let mut ctx = HeifContext::new().unwrap();
        let err = ctx.read_from_memory(vec![0u8; 64]).unwrap_err();
        assert!(err.code().is_some());
        assert_ne!(err.code(), Some(HeifErrorCode::Ok));
    }

    #[test]
    fn second_memory_read_is_a_usage_error() {
        let mut ctx = HeifContext::new().unwrap();
        let _ = ctx.read_from_memory(b"not a heif file".to_vec());
        let err = ctx.read_from_memory(b"still not".to_vec()).unwrap_err();
        assert_eq!(err, HeifError::AlreadyInitialized);
        assert_eq!(err.code(), Some(HeifErrorCode::UsageError));
    }

    #[test]
    fn missing_file_is_reported() {
        let mut ctx = HeifContext::new().unwrap();
        let err = ctx
            .read_from_file("/nonexistent/heif-bridge/missing.heic")
            .unwrap_err();
        assert!(err.code().is_some());
    }

    #[test]
    fn nul_in_path_is_rejected_before_native_call() {
        let mut ctx = HeifContext::new().unwrap();
        let err = ctx.read_from_file("bad\0path.heic").unwrap_err();
        assert!(matches!(err, HeifError::InvalidArgument { .. }));
    }

    #[test]
    fn empty_context_has_no_images() {
        let ctx = HeifContext::new().unwrap();
        assert_eq!(ctx.number_of_top_level_images(), 0);
        assert!(ctx.get_list_of_top_level_image_ids().is_empty());
        assert!(ctx.get_primary_image_handle().is_err());
    }

    #[test]
    fn memory_read_survives_second_attempt() {
        let Some(format) = round_trip_format() else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        let bytes = encoded_bytes(format, 32, 24);

        let mut ctx = HeifContext::new().unwrap();
        ctx.read_from_memory(bytes.clone()).unwrap();
        assert!(ctx.read_from_memory(bytes).is_err());

        let handle = ctx.get_primary_image_handle().unwrap();
        assert_eq!((handle.width(), handle.height()), (32, 24));
    }

    #[test]
    fn handle_outlives_memory_backed_context() {
        let Some(format) = round_trip_format() else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        let bytes = encoded_bytes(format, 16, 16);

        let _guard = tracking::enable();
        let handle = {
            let mut ctx = HeifContext::new().unwrap();
            ctx.read_from_memory(bytes).unwrap();
            ctx.get_primary_image_handle().unwrap()
        };
        assert_eq!(tracking::live(&LIVE_CONTEXTS), 0);
        assert_eq!(tracking::live(&LIVE_HANDLES), 1);
        let target = DecodeTarget::default();
        assert!(handle.decode(target.colorspace, target.chroma).is_ok());
        drop(handle);
        assert_eq!(tracking::live(&LIVE_HANDLES), 0);
    }

    #[test]
    fn top_level_ids_match_count() {
        let Some(format) = round_trip_format() else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        let mut ctx = HeifContext::new().unwrap();
        ctx.read_from_memory(encoded_bytes(format, 8, 8)).unwrap();

        let ids = ctx.get_list_of_top_level_image_ids();
        assert_eq!(ids.len(), ctx.number_of_top_level_images());
        assert_eq!(ids.len(), 1);
        assert_eq!(ctx.get_primary_image_id().unwrap(), ids[0]);
        assert!(ctx.is_top_level_image_id(ids[0]));

        let by_id = ctx.get_image_handle(ids[0]).unwrap();
        let primary = ctx.get_primary_image_handle().unwrap();
        assert_eq!(by_id.width(), primary.width());
        assert_eq!(by_id.height(), primary.height());
        assert!(primary.is_primary());
    }

    #[test]
    fn handle_calls_wait_for_the_file_lock() {
        let Some(format) = round_trip_format() else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        let mut ctx = HeifContext::new().unwrap();
        ctx.read_from_memory(encoded_bytes(format, 12, 8)).unwrap();
        let handle = ctx.get_primary_image_handle().unwrap();
        assert!(Arc::ptr_eq(&ctx.share(), handle.share()));

        let (tx, rx) = mpsc::channel();
        let file = ctx.lock();
        let worker = std::thread::spawn(move || {
            let target = DecodeTarget::default();
            let decoded = handle.decode(target.colorspace, target.chroma);
            tx.send(decoded.is_ok()).unwrap();
        });
        // The moved handle cannot reach libheif while the context side holds
        // the file.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(file);
        assert!(rx.recv().unwrap());
        worker.join().unwrap();
    }

    #[test]
    fn metadata_through_a_foreign_handle_is_rejected() {
        let Some(format) = round_trip_format() else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        let bytes = encoded_bytes(format, 8, 8);
        let mut ours = HeifContext::new().unwrap();
        ours.read_from_memory(bytes.clone()).unwrap();
        let mut theirs = HeifContext::new().unwrap();
        theirs.read_from_memory(bytes).unwrap();
        let foreign = theirs.get_primary_image_handle().unwrap();

        let err = ours.add_xmp_metadata(&foreign, b"<x:xmpmeta/>").unwrap_err();
        assert!(matches!(err, HeifError::InvalidArgument { .. }));
        assert_eq!(err.code(), Some(HeifErrorCode::UsageError));
        assert!(foreign.get_list_of_metadata_block_ids(None).unwrap().is_empty());
    }
}

