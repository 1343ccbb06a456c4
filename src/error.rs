// src/error.rs
//
// Unified error handling for heif-bridge
// Uses thiserror for simple, type-safe error handling
//
// Every libheif call returns a `heif_error { code, subcode, message }`.
// `check()` is the one place that turns a non-Ok result into `HeifError`;
// output parameters of a native call are only read after it returns Ok.

use crate::enums::{Channel, CompressionFormat, HeifErrorCode, HeifSuberrorCode};
use libheif_sys as lh;
#[cfg(feature = "napi")]
use napi::bindgen_prelude::*;
use std::borrow::Cow;
use std::ffi::CStr;
use thiserror::Error;

/// Coarse grouping used by hosts to decide how to react to a failure.
///
/// - UserError: Invalid input or misuse, recoverable by the caller
/// - CodecError: Decoder/encoder plugin or bitstream problems
/// - ResourceLimit: Memory/security limits
/// - InternalBug: Conditions the layer should never reach
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi)]
#[derive(Clone, Copy)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Invalid input, recoverable by user
    UserError,
    /// Format/encoding issues
    CodecError,
    /// Memory/security limits
    ResourceLimit,
    /// Library bugs (should not happen)
    InternalBug,
}

/// heif-bridge error types
///
/// `Native` carries a libheif result verbatim, including codes newer than the
/// tables in `enums`. The other variants are detected by this layer before the
/// native call is made, but report a code from the same table so callers can
/// match on one enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeifError {
    #[error("{message}")]
    Native {
        raw_code: u32,
        raw_subcode: u32,
        message: Cow<'static, str>,
    },

    #[error("Context already initialized with memory data")]
    AlreadyInitialized,

    #[error("Failed to get image plane data")]
    PlaneUnavailable { channel: Channel },

    #[error("Metadata block {id} does not exist")]
    MetadataNotFound { id: u32 },

    #[error("No encoder available for compression format {format}")]
    NoEncoder { format: CompressionFormat },

    #[error("Encoder descriptor '{id_name}' is no longer registered")]
    StaleDescriptor { id_name: Cow<'static, str> },

    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },
}

// Constructor Helpers
impl HeifError {
    pub fn native(
        code: HeifErrorCode,
        subcode: HeifSuberrorCode,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Native {
            raw_code: code.raw(),
            raw_subcode: subcode.raw(),
            message: message.into(),
        }
    }

    pub fn already_initialized() -> Self {
        Self::AlreadyInitialized
    }

    pub fn plane_unavailable(channel: Channel) -> Self {
        Self::PlaneUnavailable { channel }
    }

    pub fn metadata_not_found(id: u32) -> Self {
        Self::MetadataNotFound { id }
    }

    pub fn no_encoder(format: CompressionFormat) -> Self {
        Self::NoEncoder { format }
    }

    pub fn stale_descriptor(id_name: impl Into<Cow<'static, str>>) -> Self {
        Self::StaleDescriptor {
            id_name: id_name.into(),
        }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// libheif error code for this failure.
    ///
    /// `None` for runtime failures that have no native counterpart (a plane
    /// pointer the library refused to hand out) and for native codes this
    /// crate does not know; `raw_code()` still has those.
    pub fn code(&self) -> Option<HeifErrorCode> {
        match self {
            Self::Native { raw_code, .. } => HeifErrorCode::from_raw(*raw_code),
            Self::AlreadyInitialized
            | Self::StaleDescriptor { .. }
            | Self::InvalidArgument { .. } => Some(HeifErrorCode::UsageError),
            Self::MetadataNotFound { .. } => Some(HeifErrorCode::InvalidInput),
            Self::NoEncoder { .. } => Some(HeifErrorCode::UnsupportedFeature),
            Self::PlaneUnavailable { .. } => None,
        }
    }

    /// Numeric code exactly as libheif reported it.
    pub fn raw_code(&self) -> Option<u32> {
        match self {
            Self::Native { raw_code, .. } => Some(*raw_code),
            other => other.code().map(HeifErrorCode::raw),
        }
    }

    /// Numeric sub-error exactly as libheif reported it.
    pub fn raw_subcode(&self) -> u32 {
        match self {
            Self::Native { raw_subcode, .. } => *raw_subcode,
            other => other.subcode().raw(),
        }
    }

    /// Named sub-error; unlisted native values read as `Unspecified`.
    pub fn subcode(&self) -> HeifSuberrorCode {
        match self {
            Self::Native { raw_subcode, .. } => HeifSuberrorCode::from_raw(*raw_subcode),
            Self::MetadataNotFound { .. } => HeifSuberrorCode::NonexistingItemReferenced,
            Self::NoEncoder { .. } => HeifSuberrorCode::UnsupportedCodec,
            Self::InvalidArgument { .. } => HeifSuberrorCode::InvalidParameterValue,
            Self::AlreadyInitialized
            | Self::StaleDescriptor { .. }
            | Self::PlaneUnavailable { .. } => HeifSuberrorCode::Unspecified,
        }
    }

    /// Name of the code as exposed to hosts; layer-local runtime failures
    /// report `RuntimeError`, native codes outside the table `Unknown`.
    pub fn code_name(&self) -> &'static str {
        match (self.code(), self) {
            (Some(code), _) => code.as_str(),
            (None, Self::Native { .. }) => "Unknown",
            (None, _) => "RuntimeError",
        }
    }

    /// Diagnostic message, preserved verbatim for native failures.
    pub fn message(&self) -> Cow<'_, str> {
        match self {
            Self::Native { message, .. } => Cow::Borrowed(message.as_ref()),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Check if this error is recoverable (user can fix it)
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::UserError | ErrorCategory::ResourceLimit => true,
            ErrorCategory::CodecError | ErrorCategory::InternalBug => false,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        if self.subcode() == HeifSuberrorCode::SecurityLimitExceeded {
            return ErrorCategory::ResourceLimit;
        }
        match self.code() {
            Some(
                HeifErrorCode::InputDoesNotExist
                | HeifErrorCode::InvalidInput
                | HeifErrorCode::UnsupportedFiletype
                | HeifErrorCode::UsageError
                | HeifErrorCode::ColorProfileDoesNotExist,
            ) => ErrorCategory::UserError,

            Some(
                HeifErrorCode::UnsupportedFeature
                | HeifErrorCode::DecoderPluginError
                | HeifErrorCode::EncoderPluginError
                | HeifErrorCode::EncodingError
                | HeifErrorCode::PluginLoadingError,
            ) => ErrorCategory::CodecError,

            Some(HeifErrorCode::MemoryAllocationError) => ErrorCategory::ResourceLimit,

            // An Ok code never becomes an error; seeing one means a wrapper bug.
            Some(HeifErrorCode::Ok) | None => ErrorCategory::InternalBug,
        }
    }
}

/// Translate a native result into `Result<()>`.
///
/// The message pointer is copied out immediately; libheif only guarantees it
/// for the duration of the call that produced it.
pub fn check(err: lh::heif_error) -> Result<()> {
    let raw_code = err.code as u32;
    if raw_code == HeifErrorCode::Ok.raw() {
        return Ok(());
    }

    let raw_subcode = err.subcode as u32;
    if HeifErrorCode::from_raw(raw_code).is_none() {
        tracing::warn!(
            target: "heif_bridge::error",
            raw_code,
            raw_subcode,
            "libheif returned an unknown error code"
        );
    }
    let message = if err.message.is_null() {
        Cow::Borrowed("")
    } else {
        // SAFETY: libheif hands out NUL-terminated static or context-owned
        // strings that stay valid at least until the next call on the object.
        Cow::Owned(unsafe { CStr::from_ptr(err.message) }.to_string_lossy().into_owned())
    };

    Err(HeifError::Native {
        raw_code,
        raw_subcode,
        message,
    })
}

// Conversion to NAPI Error
// The code name leads the message so JS callers can branch on it without
// access to the Rust enum.
#[cfg(feature = "napi")]
impl From<HeifError> for napi::Error {
    fn from(err: HeifError) -> Self {
        let status = match err.category() {
            ErrorCategory::UserError => Status::InvalidArg,
            ErrorCategory::CodecError => Status::GenericFailure,
            ErrorCategory::ResourceLimit => Status::GenericFailure,
            ErrorCategory::InternalBug => Status::GenericFailure,
        };

        napi::Error::new(status, format!("[{}] {}", err.code_name(), err.message()))
    }
}

/// Create a JS error object carrying the libheif code as `error.code`, the
/// numeric sub-error as `error.subcode` and the category as `error.category`.
#[cfg(feature = "napi")]
pub fn create_napi_error_with_code(env: &Env, err: HeifError) -> napi::Result<Object<'_>> {
    let category = err.category();
    let err_msg = err.message().into_owned();
    let mut error_obj = env.create_error(napi::Error::new(
        match category {
            ErrorCategory::UserError => Status::InvalidArg,
            _ => Status::GenericFailure,
        },
        err_msg.clone(),
    ))?;

    error_obj.set_named_property("message", env.create_string(&err_msg)?)?;
    error_obj.set_named_property("code", env.create_string(err.code_name())?)?;
    if let Some(raw_code) = err.raw_code() {
        error_obj.set_named_property("errno", env.create_uint32(raw_code)?)?;
    }
    error_obj.set_named_property("subcode", env.create_uint32(err.raw_subcode())?)?;
    error_obj.set_named_property("category", env.create_uint32(category as u32)?)?;

    Ok(error_obj)
}

/// Convert a HeifError into a napi::Error that references the structured
/// JS error object built by `create_napi_error_with_code`.
#[cfg(feature = "napi")]
pub fn napi_error_with_code(env: &Env, err: HeifError) -> napi::Result<napi::Error> {
    let error_obj = create_napi_error_with_code(env, err)?;
    let js_unknown = error_obj.into_unknown(env)?;
    Ok(napi::Error::from(js_unknown))
}

#[cfg(feature = "napi")]
impl ErrorCategory {
    /// Get string representation of error category
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::CodecError => "CodecError",
            ErrorCategory::ResourceLimit => "ResourceLimit",
            ErrorCategory::InternalBug => "InternalBug",
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, HeifError>;
