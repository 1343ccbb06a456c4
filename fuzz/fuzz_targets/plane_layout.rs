#![no_main]

use arbitrary::Arbitrary;
use heif_bridge::PlaneLayout;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    width: u32,
    height: u32,
    bits: u8,
    channels: u8,
    stride: usize,
}

fuzz_target!(|input: Input| {
    let Ok(layout) = PlaneLayout::new(
        input.width,
        input.height,
        input.bits,
        usize::from(input.channels),
        input.stride,
    ) else {
        return;
    };

    // Accepted layouts never describe a row wider than their stride.
    assert!(layout.row_bytes() <= layout.stride());
    assert_eq!(layout.shape().len(), layout.ndim());
    assert_eq!(layout.strides().len(), layout.ndim());
    if layout.height() > 0 {
        assert!(layout.byte_len() >= layout.row_bytes());
    }
});
