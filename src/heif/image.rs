// src/heif/image.rs
//
// DecodedImage: an owned heif_image, either produced by decoding or authored
// empty and populated plane by plane before encoding.

use super::plane::{PlaneLayout, PlaneView, PlaneViewMut};
use super::{ensure_initialized, validate_dimensions};
use crate::enums::{Channel, Chroma, Colorspace, HeifErrorCode, HeifSuberrorCode};
use crate::error::{check, HeifError, Result};
use libc::c_int;
use libheif_sys as lh;
use std::ptr::NonNull;

/// Owned heif_image.
pub struct HeifImage {
    ptr: NonNull<lh::heif_image>,
}

// SAFETY: see HeifContext; exclusive use per thread is enforced by !Sync.
unsafe impl Send for HeifImage {}

impl HeifImage {
    /// Allocate an image with no planes.
    pub fn new(width: u32, height: u32, colorspace: Colorspace, chroma: Chroma) -> Result<Self> {
        validate_dimensions(width, height)?;
        ensure_initialized()?;
        let mut image = std::ptr::null_mut();
        check(unsafe {
            lh::heif_image_create(
                width as c_int,
                height as c_int,
                colorspace.raw() as _,
                chroma.raw() as _,
                &mut image,
            )
        })?;
        Self::from_raw(image)
    }

    pub(crate) fn from_raw(ptr: *mut lh::heif_image) -> Result<Self> {
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            HeifError::native(
                HeifErrorCode::MemoryAllocationError,
                HeifSuberrorCode::Unspecified,
                "libheif returned no image",
            )
        })?;
        #[cfg(test)]
        super::tracking::acquired(&super::tracking::LIVE_IMAGES);
        Ok(Self { ptr })
    }

    pub(crate) fn as_ptr(&self) -> *mut lh::heif_image {
        self.ptr.as_ptr()
    }

    /// Add an empty plane. Its geometry is fixed from here on.
    ///
    /// A channel can be added once; libheif would otherwise keep two planes
    /// for the same channel.
    pub fn add_plane(
        &mut self,
        channel: Channel,
        width: u32,
        height: u32,
        bit_depth: u8,
    ) -> Result<()> {
        validate_dimensions(width, height)?;
        if self.has_channel(channel) {
            return Err(HeifError::invalid_argument(
                "channel",
                channel.to_string(),
                "plane already exists",
            ));
        }
        check(unsafe {
            lh::heif_image_add_plane(
                self.as_ptr(),
                channel.raw() as _,
                width as c_int,
                height as c_int,
                c_int::from(bit_depth),
            )
        })?;
        tracing::trace!(
            target: "heif_bridge::image",
            %channel,
            width,
            height,
            bit_depth,
            "plane added"
        );
        Ok(())
    }

    pub fn has_channel(&self, channel: Channel) -> bool {
        unsafe { lh::heif_image_has_channel(self.as_ptr(), channel.raw() as _) != 0 }
    }

    /// Width of a channel's plane, `None` when the channel is absent.
    pub fn width(&self, channel: Channel) -> Option<u32> {
        let width = unsafe { lh::heif_image_get_width(self.as_ptr(), channel.raw() as _) };
        u32::try_from(width).ok()
    }

    pub fn height(&self, channel: Channel) -> Option<u32> {
        let height = unsafe { lh::heif_image_get_height(self.as_ptr(), channel.raw() as _) };
        u32::try_from(height).ok()
    }

    pub fn colorspace(&self) -> Colorspace {
        Colorspace::from_raw(unsafe { lh::heif_image_get_colorspace(self.as_ptr()) } as u32)
    }

    pub fn chroma_format(&self) -> Chroma {
        Chroma::from_raw(unsafe { lh::heif_image_get_chroma_format(self.as_ptr()) } as u32)
    }

    /// Significant bits per sample of a channel (8 for RGB, 10 for HDR...).
    pub fn bits_per_pixel_range(&self, channel: Channel) -> Option<u8> {
        let bits =
            unsafe { lh::heif_image_get_bits_per_pixel_range(self.as_ptr(), channel.raw() as _) };
        u8::try_from(bits).ok().filter(|&b| b > 0)
    }

    fn layout(&self, channel: Channel, stride: c_int) -> Result<PlaneLayout> {
        let unavailable = || HeifError::plane_unavailable(channel);
        let width = self.width(channel).ok_or_else(unavailable)?;
        let height = self.height(channel).ok_or_else(unavailable)?;
        let bits = self.bits_per_pixel_range(channel).ok_or_else(unavailable)?;
        let channels = match channel {
            Channel::Interleaved => self.chroma_format().interleaved_channels(),
            _ => 1,
        };
        let stride = usize::try_from(stride).map_err(|_| unavailable())?;
        PlaneLayout::new(width, height, bits, channels, stride)
    }

    /// Read-only zero-copy view of a channel's plane.
    pub fn plane(&self, channel: Channel) -> Result<PlaneView<'_>> {
        let mut stride: c_int = 0;
        let ptr = unsafe {
            lh::heif_image_get_plane_readonly(self.as_ptr(), channel.raw() as _, &mut stride)
        };
        if ptr.is_null() {
            return Err(HeifError::plane_unavailable(channel));
        }
        let layout = self.layout(channel, stride)?;
        // SAFETY: libheif owns `byte_len` bytes at `ptr` for as long as the
        // image lives; the returned view borrows `self`.
        let data = unsafe { std::slice::from_raw_parts(ptr, layout.byte_len()) };
        Ok(PlaneView::new(channel, layout, data))
    }

    /// Writable zero-copy view of a channel's plane. Holding it borrows the
    /// image mutably, so no other view of any plane can exist meanwhile.
    pub fn plane_mut(&mut self, channel: Channel) -> Result<PlaneViewMut<'_>> {
        let mut stride: c_int = 0;
        let ptr =
            unsafe { lh::heif_image_get_plane(self.as_ptr(), channel.raw() as _, &mut stride) };
        if ptr.is_null() {
            return Err(HeifError::plane_unavailable(channel));
        }
        let layout = self.layout(channel, stride)?;
        // SAFETY: as in `plane`, with exclusive access through `&mut self`.
        let data = unsafe { std::slice::from_raw_parts_mut(ptr, layout.byte_len()) };
        Ok(PlaneViewMut::new(channel, layout, data))
    }
}

impl Drop for HeifImage {
    fn drop(&mut self) {
        unsafe { lh::heif_image_release(self.ptr.as_ptr()) };
        #[cfg(test)]
        super::tracking::released(&super::tracking::LIVE_IMAGES);
    }
}

impl std::fmt::Debug for HeifImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeifImage")
            .field("colorspace", &self.colorspace())
            .field("chroma", &self.chroma_format())
            .finish_non_exhaustive()
    }
}
