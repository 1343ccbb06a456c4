// src/enums.rs
//
// libheif enumeration tables.
//
// Discriminants are the numeric values libheif publishes in heif.h. They are
// part of the ABI: tooling that inspects error codes or chroma layouts relies on
// them, and every conversion to the native side goes through `raw()`.

#[cfg(feature = "napi")]
use napi_derive::napi;

/// Top-level error code of a libheif result (`heif_error_code`).
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi)]
#[derive(Clone, Copy)]
#[repr(u32)]
pub enum HeifErrorCode {
    Ok = 0,
    InputDoesNotExist = 1,
    InvalidInput = 2,
    UnsupportedFiletype = 3,
    UnsupportedFeature = 4,
    UsageError = 5,
    MemoryAllocationError = 6,
    DecoderPluginError = 7,
    EncoderPluginError = 8,
    EncodingError = 9,
    ColorProfileDoesNotExist = 10,
    PluginLoadingError = 11,
}

impl HeifErrorCode {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Ok,
            1 => Self::InputDoesNotExist,
            2 => Self::InvalidInput,
            3 => Self::UnsupportedFiletype,
            4 => Self::UnsupportedFeature,
            5 => Self::UsageError,
            6 => Self::MemoryAllocationError,
            7 => Self::DecoderPluginError,
            8 => Self::EncoderPluginError,
            9 => Self::EncodingError,
            10 => Self::ColorProfileDoesNotExist,
            11 => Self::PluginLoadingError,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Symbolic name, identical to the host-facing enum member.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::InputDoesNotExist => "InputDoesNotExist",
            Self::InvalidInput => "InvalidInput",
            Self::UnsupportedFiletype => "UnsupportedFiletype",
            Self::UnsupportedFeature => "UnsupportedFeature",
            Self::UsageError => "UsageError",
            Self::MemoryAllocationError => "MemoryAllocationError",
            Self::DecoderPluginError => "DecoderPluginError",
            Self::EncoderPluginError => "EncoderPluginError",
            Self::EncodingError => "EncodingError",
            Self::ColorProfileDoesNotExist => "ColorProfileDoesNotExist",
            Self::PluginLoadingError => "PluginLoadingError",
        }
    }
}

/// Detail code of a libheif result (`heif_suberror_code`).
///
/// Only the sub-errors this crate can surface or that callers commonly match
/// on are named. Anything else reads as `Unspecified` here; the exact number
/// stays available through `HeifError::raw_subcode`.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi)]
#[derive(Clone, Copy)]
#[repr(u32)]
pub enum HeifSuberrorCode {
    Unspecified = 0,
    EndOfData = 100,
    InvalidBoxSize = 101,
    NoFtypBox = 102,
    NoIdatBox = 103,
    NoMetaBox = 104,
    NoHdlrBox = 105,
    NoHvcCBox = 106,
    NoPitmBox = 107,
    NoIpcoBox = 108,
    NoIpmaBox = 109,
    NoIlocBox = 110,
    NoIinfBox = 111,
    NoIprpBox = 112,
    NoIrefBox = 113,
    NoPictHandler = 114,
    IpmaBoxReferencesNonexistingProperty = 115,
    NoPropertiesAssignedToItem = 116,
    NoItemData = 117,
    InvalidGridData = 118,
    MissingGridImages = 119,
    InvalidCleanAperture = 120,
    InvalidOverlayData = 121,
    OverlayImageOutsideOfCanvas = 122,
    AuxiliaryImageTypeUnspecified = 123,
    NoOrInvalidPrimaryItem = 124,
    NoInfeBox = 125,
    UnknownColorProfileType = 126,
    WrongTileImageChromaFormat = 127,
    InvalidFractionalNumber = 128,
    InvalidImageSize = 129,
    InvalidPixiBox = 130,
    NoAv1CBox = 131,
    WrongTileImagePixelDepth = 132,
    SecurityLimitExceeded = 1000,
    NonexistingItemReferenced = 2000,
    NullPointerArgument = 2001,
    NonexistingImageChannelReferenced = 2002,
    UnsupportedPluginVersion = 2003,
    UnsupportedWriterVersion = 2004,
    UnsupportedParameter = 2005,
    InvalidParameterValue = 2006,
    UnsupportedCodec = 3000,
    UnsupportedImageType = 3001,
    UnsupportedDataVersion = 3002,
    UnsupportedColorConversion = 3003,
    UnsupportedItemConstructionMethod = 3004,
    UnsupportedBitDepth = 4000,
    CannotWriteOutputData = 5000,
    EncoderInitialization = 5001,
    EncoderEncoding = 5002,
    EncoderCleanup = 5003,
    PluginLoadingError = 6000,
    PluginIsNotLoaded = 6001,
    CannotReadPluginDirectory = 6002,
}

impl HeifSuberrorCode {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            100 => Self::EndOfData,
            101 => Self::InvalidBoxSize,
            102 => Self::NoFtypBox,
            103 => Self::NoIdatBox,
            104 => Self::NoMetaBox,
            105 => Self::NoHdlrBox,
            106 => Self::NoHvcCBox,
            107 => Self::NoPitmBox,
            108 => Self::NoIpcoBox,
            109 => Self::NoIpmaBox,
            110 => Self::NoIlocBox,
            111 => Self::NoIinfBox,
            112 => Self::NoIprpBox,
            113 => Self::NoIrefBox,
            114 => Self::NoPictHandler,
            115 => Self::IpmaBoxReferencesNonexistingProperty,
            116 => Self::NoPropertiesAssignedToItem,
            117 => Self::NoItemData,
            118 => Self::InvalidGridData,
            119 => Self::MissingGridImages,
            120 => Self::InvalidCleanAperture,
            121 => Self::InvalidOverlayData,
            122 => Self::OverlayImageOutsideOfCanvas,
            123 => Self::AuxiliaryImageTypeUnspecified,
            124 => Self::NoOrInvalidPrimaryItem,
            125 => Self::NoInfeBox,
            126 => Self::UnknownColorProfileType,
            127 => Self::WrongTileImageChromaFormat,
            128 => Self::InvalidFractionalNumber,
            129 => Self::InvalidImageSize,
            130 => Self::InvalidPixiBox,
            131 => Self::NoAv1CBox,
            132 => Self::WrongTileImagePixelDepth,
            1000 => Self::SecurityLimitExceeded,
            2000 => Self::NonexistingItemReferenced,
            2001 => Self::NullPointerArgument,
            2002 => Self::NonexistingImageChannelReferenced,
            2003 => Self::UnsupportedPluginVersion,
            2004 => Self::UnsupportedWriterVersion,
            2005 => Self::UnsupportedParameter,
            2006 => Self::InvalidParameterValue,
            3000 => Self::UnsupportedCodec,
            3001 => Self::UnsupportedImageType,
            3002 => Self::UnsupportedDataVersion,
            3003 => Self::UnsupportedColorConversion,
            3004 => Self::UnsupportedItemConstructionMethod,
            4000 => Self::UnsupportedBitDepth,
            5000 => Self::CannotWriteOutputData,
            5001 => Self::EncoderInitialization,
            5002 => Self::EncoderEncoding,
            5003 => Self::EncoderCleanup,
            6000 => Self::PluginLoadingError,
            6001 => Self::PluginIsNotLoaded,
            6002 => Self::CannotReadPluginDirectory,
            _ => Self::Unspecified,
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// Channel semantics of a decoded image (`heif_colorspace`).
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi)]
#[derive(Clone, Copy)]
#[repr(u32)]
pub enum Colorspace {
    YCbCr = 0,
    Rgb = 1,
    Monochrome = 2,
    Undefined = 99,
}

impl Colorspace {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::YCbCr,
            1 => Self::Rgb,
            2 => Self::Monochrome,
            _ => Self::Undefined,
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// Subsampling / interleaving layout (`heif_chroma`).
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi)]
#[derive(Clone, Copy)]
#[repr(u32)]
pub enum Chroma {
    Monochrome = 0,
    C420 = 1,
    C422 = 2,
    C444 = 3,
    InterleavedRgb = 10,
    InterleavedRgba = 11,
    InterleavedRrggbbBe = 12,
    InterleavedRrggbbaaBe = 13,
    InterleavedRrggbbLe = 14,
    InterleavedRrggbbaaLe = 15,
    Undefined = 99,
}

impl Chroma {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Monochrome,
            1 => Self::C420,
            2 => Self::C422,
            3 => Self::C444,
            10 => Self::InterleavedRgb,
            11 => Self::InterleavedRgba,
            12 => Self::InterleavedRrggbbBe,
            13 => Self::InterleavedRrggbbaaBe,
            14 => Self::InterleavedRrggbbLe,
            15 => Self::InterleavedRrggbbaaLe,
            _ => Self::Undefined,
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Number of samples stored per pixel in the single interleaved plane,
    /// or 1 for planar layouts.
    ///
    /// RRGGBB carries three 16-bit samples per pixel; describing it with four
    /// would let a consumer walk past the end of every row.
    pub fn interleaved_channels(self) -> usize {
        match self {
            Self::InterleavedRgb | Self::InterleavedRrggbbBe | Self::InterleavedRrggbbLe => 3,
            Self::InterleavedRgba | Self::InterleavedRrggbbaaBe | Self::InterleavedRrggbbaaLe => 4,
            _ => 1,
        }
    }

    pub fn is_interleaved(self) -> bool {
        self.interleaved_channels() > 1
    }
}

/// Plane identity inside a decoded image (`heif_channel`).
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi)]
#[derive(Clone, Copy)]
#[repr(u32)]
pub enum Channel {
    Y = 0,
    Cb = 1,
    Cr = 2,
    R = 3,
    G = 4,
    B = 5,
    Alpha = 6,
    Interleaved = 10,
}

impl Channel {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// Codec used for an image item (`heif_compression_format`).
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi)]
#[derive(Clone, Copy)]
#[repr(u32)]
pub enum CompressionFormat {
    Undefined = 0,
    Hevc = 1,
    Avc = 2,
    Jpeg = 3,
    Av1 = 4,
    Vvc = 5,
    Evc = 6,
    Jpeg2000 = 7,
}

impl CompressionFormat {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Hevc,
            2 => Self::Avc,
            3 => Self::Jpeg,
            4 => Self::Av1,
            5 => Self::Vvc,
            6 => Self::Evc,
            7 => Self::Jpeg2000,
            _ => Self::Undefined,
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Hevc => "HEVC",
            Self::Avc => "AVC",
            Self::Jpeg => "JPEG",
            Self::Av1 => "AV1",
            Self::Vvc => "VVC",
            Self::Evc => "EVC",
            Self::Jpeg2000 => "JPEG2000",
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
