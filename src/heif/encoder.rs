// src/heif/encoder.rs
//
// Encoder plugins: enumeration into plain value records, and an owned
// heif_encoder configured before each encode.

use super::context::HeifContext;
use super::handle::ImageHandle;
use super::image::HeifImage;
use super::{copy_c_str, ensure_initialized, filled_len, to_cstring};
use crate::enums::{CompressionFormat, HeifErrorCode, HeifSuberrorCode};
use crate::error::{check, HeifError, Result};
use libc::c_int;
use libheif_sys as lh;
use std::ffi::CString;
use std::ptr::NonNull;

/// Copy of one libheif encoder descriptor. libheif's own descriptor pointers
/// are re-resolved by `id_name` whenever an encoder is created from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderDescriptor {
    /// Short identifier, e.g. "x265" or "aom".
    pub id_name: String,
    /// Human readable name including the plugin version.
    pub name: String,
    pub compression_format: CompressionFormat,
    pub supports_lossy: bool,
    pub supports_lossless: bool,
}

impl EncoderDescriptor {
    /// # Safety
    /// `raw` must be a descriptor pointer just returned by libheif.
    unsafe fn copy_from(raw: *const lh::heif_encoder_descriptor) -> Self {
        unsafe {
            Self {
                id_name: copy_c_str(lh::heif_encoder_descriptor_get_id_name(raw))
                    .unwrap_or_default(),
                name: copy_c_str(lh::heif_encoder_descriptor_get_name(raw)).unwrap_or_default(),
                compression_format: CompressionFormat::from_raw(
                    lh::heif_encoder_descriptor_get_compression_format(raw) as u32,
                ),
                supports_lossy: lh::heif_encoder_descriptor_supports_lossy_compression(raw) != 0,
                supports_lossless: lh::heif_encoder_descriptor_supports_lossless_compression(raw)
                    != 0,
            }
        }
    }
}

/// Count-then-fill over libheif's static descriptor table.
fn raw_descriptors(
    format: CompressionFormat,
    name: Option<&CString>,
) -> Vec<*const lh::heif_encoder_descriptor> {
    let name_ptr = name.map_or(std::ptr::null(), |n| n.as_ptr());
    let count = unsafe {
        lh::heif_get_encoder_descriptors(format.raw() as _, name_ptr, std::ptr::null_mut(), 0)
    };
    let Ok(count) = usize::try_from(count) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }
    let mut descriptors = vec![std::ptr::null(); count];
    let filled = unsafe {
        lh::heif_get_encoder_descriptors(
            format.raw() as _,
            name_ptr,
            descriptors.as_mut_ptr(),
            c_int::try_from(count).unwrap_or(c_int::MAX),
        )
    };
    descriptors.truncate(filled_len("encoder descriptors", count, filled));
    descriptors.retain(|d| !d.is_null());
    tracing::trace!(
        target: "heif_bridge::encoder",
        format = %format,
        count = descriptors.len(),
        "listed encoder descriptors"
    );
    descriptors
}

/// Available encoder plugins. `None` / `Undefined` format and an absent or
/// empty name disable the respective filter.
pub fn get_encoder_descriptors(
    format: Option<CompressionFormat>,
    name: Option<&str>,
) -> Result<Vec<EncoderDescriptor>> {
    ensure_initialized()?;
    let name = name
        .filter(|value| !value.is_empty())
        .map(|value| to_cstring("name", value))
        .transpose()?;
    let format = format.unwrap_or(CompressionFormat::Undefined);
    Ok(raw_descriptors(format, name.as_ref())
        .into_iter()
        // SAFETY: pointers come straight from libheif's static table.
        .map(|raw| unsafe { EncoderDescriptor::copy_from(raw) })
        .collect())
}

/// Owned heif_encoder.
pub struct Encoder {
    ptr: NonNull<lh::heif_encoder>,
    format: CompressionFormat,
}

// SAFETY: see HeifContext; exclusive use per thread is enforced by !Sync.
unsafe impl Send for Encoder {}

impl Encoder {
    /// Best available encoder for `format`.
    pub fn new(format: CompressionFormat) -> Result<Self> {
        ensure_initialized()?;
        if format == CompressionFormat::Undefined || raw_descriptors(format, None).is_empty() {
            return Err(HeifError::no_encoder(format));
        }
        let mut encoder = std::ptr::null_mut();
        check(unsafe {
            lh::heif_context_get_encoder_for_format(
                std::ptr::null_mut(),
                format.raw() as _,
                &mut encoder,
            )
        })?;
        Self::from_raw(encoder, format)
    }

    /// The exact plugin named by `descriptor`.
    pub fn from_descriptor(descriptor: &EncoderDescriptor) -> Result<Self> {
        ensure_initialized()?;
        let raw = raw_descriptors(descriptor.compression_format, None)
            .into_iter()
            .find(|&raw| {
                // SAFETY: pointer from libheif's static descriptor table.
                let id = unsafe { copy_c_str(lh::heif_encoder_descriptor_get_id_name(raw)) };
                id.as_deref() == Some(descriptor.id_name.as_str())
            })
            .ok_or_else(|| HeifError::stale_descriptor(descriptor.id_name.clone()))?;

        let mut encoder = std::ptr::null_mut();
        check(unsafe { lh::heif_context_get_encoder(std::ptr::null_mut(), raw, &mut encoder) })?;
        Self::from_raw(encoder, descriptor.compression_format)
    }

    fn from_raw(ptr: *mut lh::heif_encoder, format: CompressionFormat) -> Result<Self> {
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            HeifError::native(
                HeifErrorCode::EncoderPluginError,
                HeifSuberrorCode::UnsupportedCodec,
                "libheif returned no encoder",
            )
        })?;
        #[cfg(test)]
        super::tracking::acquired(&super::tracking::LIVE_ENCODERS);
        let encoder = Self { ptr, format };
        tracing::debug!(
            target: "heif_bridge::encoder",
            name = %encoder.name(),
            format = %format,
            "encoder allocated"
        );
        Ok(encoder)
    }

    pub fn name(&self) -> String {
        // SAFETY: the name is owned by the plugin and outlives this call.
        unsafe { copy_c_str(lh::heif_encoder_get_name(self.ptr.as_ptr())) }.unwrap_or_default()
    }

    pub fn compression_format(&self) -> CompressionFormat {
        self.format
    }

    /// Quality for lossy compression, 0 (worst) to 100 (best).
    pub fn set_lossy_quality(&mut self, quality: u8) -> Result<()> {
        if quality > 100 {
            return Err(HeifError::invalid_argument(
                "quality",
                quality.to_string(),
                "quality must be between 0 and 100",
            ));
        }
        check(unsafe {
            lh::heif_encoder_set_lossy_quality(self.ptr.as_ptr(), c_int::from(quality))
        })
    }

    pub fn set_lossless(&mut self, lossless: bool) -> Result<()> {
        check(unsafe { lh::heif_encoder_set_lossless(self.ptr.as_ptr(), c_int::from(lossless)) })
    }

    /// Set a plugin parameter by name; unknown names and invalid values are
    /// reported by the plugin.
    pub fn set_parameter(&mut self, name: &str, value: &str) -> Result<()> {
        let c_name = to_cstring("parameter", name)?;
        let c_value = to_cstring("value", value)?;
        check(unsafe {
            lh::heif_encoder_set_parameter(self.ptr.as_ptr(), c_name.as_ptr(), c_value.as_ptr())
        })?;
        tracing::trace!(target: "heif_bridge::encoder", name, value, "parameter set");
        Ok(())
    }

    /// Encode `image` into `ctx` and return the handle of the new image.
    ///
    /// A non-empty `preset` is applied as the "preset" parameter first and
    /// replaces any value set earlier through `set_parameter`.
    #[tracing::instrument(
        skip_all,
        fields(format = %self.format, preset = tracing::field::Empty)
    )]
    pub fn encode_image(
        &mut self,
        ctx: &mut HeifContext,
        image: &HeifImage,
        preset: Option<&str>,
    ) -> Result<ImageHandle> {
        if let Some(preset) = preset.filter(|p| !p.is_empty()) {
            tracing::Span::current().record("preset", preset);
            self.set_parameter("preset", preset)?;
        }
        let mut handle = std::ptr::null_mut();
        let file = ctx.lock();
        check(unsafe {
            lh::heif_context_encode_image(
                ctx.as_ptr(),
                image.as_ptr(),
                self.ptr.as_ptr(),
                std::ptr::null(),
                &mut handle,
            )
        })?;
        drop(file);
        tracing::debug!(target: "heif_bridge::encoder", "image encoded");
        ImageHandle::from_raw(handle, ctx.share())
    }
}

impl Drop for Encoder {
    fn drop(&mut self) {
        unsafe { lh::heif_encoder_release(self.ptr.as_ptr()) };
        #[cfg(test)]
        super::tracking::released(&super::tracking::LIVE_ENCODERS);
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("name", &self.name())
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heif::has_encoder;
    use crate::heif::test_support::{gradient_rgb, round_trip_format};
    use crate::heif::tracking::{self, LIVE_ENCODERS};

    #[test]
    fn undefined_format_has_no_encoder() {
        let err = Encoder::new(CompressionFormat::Undefined).unwrap_err();
        assert_eq!(err, HeifError::no_encoder(CompressionFormat::Undefined));
        assert_eq!(err.code(), Some(HeifErrorCode::UnsupportedFeature));
    }

    #[test]
    fn descriptors_match_registered_encoders() {
        let all = get_encoder_descriptors(None, None).unwrap();
        for format in [
            CompressionFormat::Hevc,
            CompressionFormat::Av1,
            CompressionFormat::Jpeg,
            CompressionFormat::Jpeg2000,
        ] {
            let filtered = get_encoder_descriptors(Some(format), None).unwrap();
            assert_eq!(!filtered.is_empty(), has_encoder(format));
            assert!(filtered.iter().all(|d| d.compression_format == format));
            assert!(filtered.iter().all(|d| all.contains(d)));
        }
        assert!(all.iter().all(|d| !d.id_name.is_empty()));
    }

    #[test]
    fn unknown_descriptor_is_stale() {
        let ghost = EncoderDescriptor {
            id_name: "no-such-plugin".to_string(),
            name: "Ghost".to_string(),
            compression_format: CompressionFormat::Hevc,
            supports_lossy: true,
            supports_lossless: false,
        };
        let err = Encoder::from_descriptor(&ghost).unwrap_err();
        assert!(matches!(err, HeifError::StaleDescriptor { .. }));
        assert_eq!(err.code(), Some(HeifErrorCode::UsageError));
    }

    #[test]
    fn encoder_from_descriptor_and_quality_bounds() {
        let Some(format) = round_trip_format() else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        let descriptor = get_encoder_descriptors(Some(format), None)
            .unwrap()
            .remove(0);

        let _guard = tracking::enable();
        {
            let mut encoder = Encoder::from_descriptor(&descriptor).unwrap();
            assert_eq!(encoder.compression_format(), format);
            assert!(!encoder.name().is_empty());
            assert!(encoder.set_lossy_quality(50).is_ok());
            let err = encoder.set_lossy_quality(101).unwrap_err();
            assert_eq!(err.code(), Some(HeifErrorCode::UsageError));
            assert!(encoder
                .set_parameter("definitely-not-a-parameter", "1")
                .is_err());
            assert_eq!(tracking::live(&LIVE_ENCODERS), 1);
        }
        assert_eq!(tracking::live(&LIVE_ENCODERS), 0);
    }

    #[test]
    fn encode_appends_top_level_image() {
        let Some(format) = round_trip_format() else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        let mut ctx = HeifContext::new().unwrap();
        let mut encoder = Encoder::new(format).unwrap();
        let image = gradient_rgb(24, 16);

        let handle = encoder.encode_image(&mut ctx, &image, Some("")).unwrap();
        assert_eq!((handle.width(), handle.height()), (24, 16));
        assert_eq!(ctx.number_of_top_level_images(), 1);

        encoder.encode_image(&mut ctx, &image, None).unwrap();
        assert_eq!(ctx.get_list_of_top_level_image_ids().len(), 2);
    }

    #[test]
    fn preset_argument_is_applied_before_encoding() {
        let Some(format) = round_trip_format() else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        let mut ctx = HeifContext::new().unwrap();
        let mut encoder = Encoder::new(format).unwrap();
        let image = gradient_rgb(16, 16);

        // Plugins without a "preset" parameter and plugins that do not know
        // this value both refuse it with a usage error.
        let err = encoder
            .encode_image(&mut ctx, &image, Some("no-such-preset"))
            .unwrap_err();
        assert_eq!(err.code(), Some(HeifErrorCode::UsageError));
        assert_eq!(ctx.number_of_top_level_images(), 0);
    }

    #[test]
    fn preset_argument_overrides_earlier_parameter() {
        let Some(format) = round_trip_format() else {
            eprintln!("skipping: no libheif encoder/decoder pair available");
            return;
        };
        let mut ctx = HeifContext::new().unwrap();
        let mut encoder = Encoder::new(format).unwrap();
        if encoder.set_parameter("preset", "medium").is_err() {
            eprintln!("skipping: {} has no \"medium\" preset", encoder.name());
            return;
        }
        let image = gradient_rgb(16, 16);

        let err = encoder
            .encode_image(&mut ctx, &image, Some("no-such-preset"))
            .unwrap_err();
        assert_eq!(err.code(), Some(HeifErrorCode::UsageError));
        assert_eq!(ctx.number_of_top_level_images(), 0);

        // Without an argument the earlier valid preset still applies.
        encoder.encode_image(&mut ctx, &image, None).unwrap();
        assert_eq!(ctx.number_of_top_level_images(), 1);
    }
}
