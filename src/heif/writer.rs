// src/heif/writer.rs
//
// Push-style sink for heif_context_write.
// libheif calls `write_callback` with chunks of the serialised file. The
// callback runs inside a C frame, so it never unwinds: allocation failure and
// panics are both reported back as a heif_error value.

use crate::enums::{HeifErrorCode, HeifSuberrorCode};
use crate::error::{check, Result};
use libc::c_void;
use libheif_sys as lh;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::NonNull;

const WRITER_API_VERSION: libc::c_int = 1;

/// Append-only accumulator handed to libheif as callback user data.
#[derive(Default)]
pub(crate) struct ByteSink {
    buf: Vec<u8>,
}

impl ByteSink {
    /// Make room for `additional` bytes without aborting on failure.
    fn reserve(&mut self, additional: usize) -> lh::heif_error {
        if self.buf.try_reserve(additional).is_err() {
            return native_error(
                HeifErrorCode::MemoryAllocationError,
                c"Cannot grow output buffer",
            );
        }
        native_error(HeifErrorCode::Ok, c"Success")
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

fn native_error(code: HeifErrorCode, message: &'static std::ffi::CStr) -> lh::heif_error {
    lh::heif_error {
        code: code.raw() as _,
        subcode: HeifSuberrorCode::Unspecified.raw() as _,
        message: message.as_ptr(),
    }
}

unsafe extern "C" fn write_callback(
    _ctx: *mut lh::heif_context,
    data: *const c_void,
    size: usize,
    userdata: *mut c_void,
) -> lh::heif_error {
    if userdata.is_null() || (data.is_null() && size > 0) {
        return native_error(HeifErrorCode::UsageError, c"Invalid writer arguments");
    }
    // SAFETY: userdata is the `&mut ByteSink` passed by `write_context`,
    // which outlives the heif_context_write call.
    let sink = unsafe { &mut *userdata.cast::<ByteSink>() };
    // SAFETY: `data` is non-null with `size` readable bytes, checked above
    // and guaranteed by libheif.
    guarded(|| unsafe { append(sink, data, size) })
}

/// Run `op` so that a panic comes back as a heif_error instead of unwinding
/// into libheif.
fn guarded(op: impl FnOnce() -> lh::heif_error) -> lh::heif_error {
    catch_unwind(AssertUnwindSafe(op)).unwrap_or_else(|_| {
        native_error(
            HeifErrorCode::MemoryAllocationError,
            c"Panic while buffering output",
        )
    })
}

/// Reserve first, then view the chunk: a chunk too large to buffer is
/// rejected before a slice over it is ever formed.
///
/// # Safety
/// When `size > 0`, `data` must point to `size` readable bytes.
unsafe fn append(sink: &mut ByteSink, data: *const c_void, size: usize) -> lh::heif_error {
    if size == 0 {
        return native_error(HeifErrorCode::Ok, c"Success");
    }
    let reserved = sink.reserve(size);
    if reserved.code as u32 != HeifErrorCode::Ok.raw() {
        return reserved;
    }
    // SAFETY: libheif guarantees `size` readable bytes at `data`, and the
    // reservation above proved `size` fits in an allocation.
    let chunk = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), size) };
    sink.buf.extend_from_slice(chunk);
    native_error(HeifErrorCode::Ok, c"Success")
}

/// Serialise the whole context into memory.
pub(crate) fn write_context(ctx: NonNull<lh::heif_context>) -> Result<Vec<u8>> {
    let mut sink = ByteSink::default();
    let mut writer = lh::heif_writer {
        writer_api_version: WRITER_API_VERSION,
        write: Some(write_callback),
    };
    let err = unsafe {
        lh::heif_context_write(
            ctx.as_ptr(),
            &mut writer,
            (&mut sink as *mut ByteSink).cast::<c_void>(),
        )
    };
    check(err)?;
    tracing::debug!(
        target: "heif_bridge::writer",
        bytes = sink.buf.len(),
        "container serialised to memory"
    );
    Ok(sink.into_inner())
}
