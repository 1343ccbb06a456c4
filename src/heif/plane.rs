// src/heif/plane.rs
//
// Zero-copy views into one plane of a decoded image.
//
// `PlaneLayout` is the pure geometry: element size from the bit depth, sample
// multiplicity from the chroma layout, and the row stride exactly as libheif
// reports it (rows may be padded). Views borrow the owning `HeifImage`, so a
// view can never outlive the pixels and a writable view excludes all others.

use crate::enums::Channel;
use crate::error::{HeifError, Result};

/// Sample type of one element in a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    U16,
}

impl SampleFormat {
    pub fn item_size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
        }
    }

    /// Buffer-protocol format character ("B" = uint8, "H" = uint16).
    pub fn format_code(self) -> &'static str {
        match self {
            Self::U8 => "B",
            Self::U16 => "H",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
        }
    }
}

/// Geometry of one plane in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    width: usize,
    height: usize,
    channels: usize,
    format: SampleFormat,
    stride: usize,
}

impl PlaneLayout {
    /// Build a layout from native plane properties.
    ///
    /// `bits_per_pixel` is the per-sample bit range (10-bit samples occupy
    /// two bytes). `stride` is the distance between rows in bytes.
    pub fn new(
        width: u32,
        height: u32,
        bits_per_pixel: u8,
        channels: usize,
        stride: usize,
    ) -> Result<Self> {
        let format = match bits_per_pixel.div_ceil(8) {
            1 => SampleFormat::U8,
            2 => SampleFormat::U16,
            _ => {
                return Err(HeifError::invalid_argument(
                    "bits_per_pixel",
                    bits_per_pixel.to_string(),
                    "planes hold 1 to 16 bits per sample",
                ))
            }
        };
        if channels == 0 {
            return Err(HeifError::invalid_argument(
                "channels",
                "0",
                "a plane has at least one sample per pixel",
            ));
        }
        let layout = Self {
            width: width as usize,
            height: height as usize,
            channels,
            format,
            stride,
        };
        let row_bytes = layout.checked_row_bytes().ok_or_else(|| {
            HeifError::invalid_argument("width", width.to_string(), "row size overflows usize")
        })?;
        if stride < row_bytes {
            return Err(HeifError::invalid_argument(
                "stride",
                stride.to_string(),
                format!("stride is shorter than a row of {row_bytes} bytes"),
            ));
        }
        if layout.checked_byte_len().is_none() {
            return Err(HeifError::invalid_argument(
                "height",
                height.to_string(),
                "plane size overflows usize",
            ));
        }
        Ok(layout)
    }

    fn checked_row_bytes(&self) -> Option<usize> {
        self.width
            .checked_mul(self.channels)?
            .checked_mul(self.format.item_size())
    }

    fn checked_byte_len(&self) -> Option<usize> {
        match self.height {
            0 => Some(0),
            h => self
                .stride
                .checked_mul(h - 1)?
                .checked_add(self.checked_row_bytes()?),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Samples per pixel: 3 or 4 for interleaved planes, otherwise 1.
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.format
    }

    pub fn element_bytes(&self) -> usize {
        self.format.item_size()
    }

    /// Row stride in bytes, padding included.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Bytes of pixel data in one row, padding excluded.
    pub fn row_bytes(&self) -> usize {
        self.width * self.channels * self.element_bytes()
    }

    /// Bytes from the first sample to one past the last sample. The padding
    /// after the last row is not included.
    pub fn byte_len(&self) -> usize {
        match self.height {
            0 => 0,
            h => self.stride * (h - 1) + self.row_bytes(),
        }
    }

    pub fn ndim(&self) -> usize {
        if self.channels == 1 {
            2
        } else {
            3
        }
    }

    /// `(height, width)` for planar, `(height, width, channels)` for
    /// interleaved planes.
    pub fn shape(&self) -> Vec<usize> {
        if self.channels == 1 {
            vec![self.height, self.width]
        } else {
            vec![self.height, self.width, self.channels]
        }
    }

    /// Byte strides matching `shape()`.
    pub fn strides(&self) -> Vec<usize> {
        let elem = self.element_bytes();
        if self.channels == 1 {
            vec![self.stride, elem]
        } else {
            vec![self.stride, self.channels * elem, elem]
        }
    }

    fn row_range(&self, y: usize) -> std::ops::Range<usize> {
        assert!(
            y < self.height,
            "row {y} out of range for plane of height {}",
            self.height
        );
        let start = y * self.stride;
        start..start + self.row_bytes()
    }
}

/// Buffer description a numeric-array consumer can use without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub ptr: *mut u8,
    pub item_size: usize,
    pub format: SampleFormat,
    pub ndim: usize,
    pub shape: Vec<usize>,
    pub strides: Vec<usize>,
    pub readonly: bool,
}

impl BufferDescriptor {
    fn new(ptr: *mut u8, layout: &PlaneLayout, readonly: bool) -> Self {
        Self {
            ptr,
            item_size: layout.element_bytes(),
            format: layout.sample_format(),
            ndim: layout.ndim(),
            shape: layout.shape(),
            strides: layout.strides(),
            readonly,
        }
    }
}

/// Read-only view of one plane.
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    channel: Channel,
    layout: PlaneLayout,
    data: &'a [u8],
}

impl<'a> PlaneView<'a> {
    pub(crate) fn new(channel: Channel, layout: PlaneLayout, data: &'a [u8]) -> Self {
        debug_assert_eq!(data.len(), layout.byte_len());
        Self {
            channel,
            layout,
            data,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn layout(&self) -> &PlaneLayout {
        &self.layout
    }

    /// All plane bytes, inter-row padding included.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Pixel bytes of row `y` without padding.
    ///
    /// # Panics
    /// When `y` is not below the plane height.
    pub fn row(&self, y: usize) -> &'a [u8] {
        &self.data[self.layout.row_range(y)]
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.layout.height).map(move |y| self.row(y))
    }

    /// Tightly packed copy of the plane (padding removed).
    pub fn to_packed(&self) -> Vec<u8> {
        let mut packed = Vec::with_capacity(self.layout.row_bytes() * self.layout.height);
        for row in self.rows() {
            packed.extend_from_slice(row);
        }
        packed
    }

    pub fn descriptor(&self) -> BufferDescriptor {
        BufferDescriptor::new(self.data.as_ptr().cast_mut(), &self.layout, true)
    }
}

/// Writable view of one plane; holds the image mutably borrowed.
#[derive(Debug)]
pub struct PlaneViewMut<'a> {
    channel: Channel,
    layout: PlaneLayout,
    data: &'a mut [u8],
}

impl<'a> PlaneViewMut<'a> {
    pub(crate) fn new(channel: Channel, layout: PlaneLayout, data: &'a mut [u8]) -> Self {
        debug_assert_eq!(data.len(), layout.byte_len());
        Self {
            channel,
            layout,
            data,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn layout(&self) -> &PlaneLayout {
        &self.layout
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[self.layout.row_range(y)]
    }

    /// # Panics
    /// When `y` is not below the plane height.
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let range = self.layout.row_range(y);
        &mut self.data[range]
    }

    /// Copy tightly packed rows into the plane, honouring its stride.
    pub fn copy_from_packed(&mut self, packed: &[u8]) -> Result<()> {
        let row_bytes = self.layout.row_bytes();
        let expected = row_bytes * self.layout.height;
        if packed.len() != expected {
            return Err(HeifError::invalid_argument(
                "pixels",
                packed.len().to_string(),
                format!("expected {expected} bytes of packed {} data", self.channel),
            ));
        }
        if row_bytes == 0 {
            return Ok(());
        }
        for (y, src) in packed.chunks_exact(row_bytes).enumerate() {
            self.row_mut(y).copy_from_slice(src);
        }
        Ok(())
    }

    pub fn descriptor(&mut self) -> BufferDescriptor {
        BufferDescriptor::new(self.data.as_mut_ptr(), &self.layout, false)
    }

    /// Downgrade to a read-only view for the rest of the borrow.
    pub fn into_view(self) -> PlaneView<'a> {
        PlaneView::new(self.channel, self.layout, self.data)
    }
}
