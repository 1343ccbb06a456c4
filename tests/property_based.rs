// tests/property_based.rs
//
// Property tests for plane layout math and zero-copy views.

use heif_bridge::{Channel, Chroma, Colorspace, HeifImage, PlaneLayout, SampleFormat};
use proptest::prelude::*;

fn interleaved_chroma() -> impl Strategy<Value = (Chroma, usize, u8)> {
    prop_oneof![
        Just((Chroma::InterleavedRgb, 3usize, 8u8)),
        Just((Chroma::InterleavedRgba, 4, 8)),
        Just((Chroma::InterleavedRrggbbLe, 3, 10)),
        Just((Chroma::InterleavedRrggbbBe, 3, 12)),
        Just((Chroma::InterleavedRrggbbaaLe, 4, 16)),
        Just((Chroma::InterleavedRrggbbaaBe, 4, 10)),
    ]
}

proptest! {
    #[test]
    fn layout_shape_and_strides(
        width in 1u32..=512,
        height in 1u32..=512,
        bits in 1u8..=16,
        channels in prop_oneof![Just(1usize), Just(3), Just(4)],
        padding in 0usize..64,
    ) {
        let elem = if bits > 8 { 2 } else { 1 };
        let row = width as usize * channels * elem;
        let layout = PlaneLayout::new(width, height, bits, channels, row + padding).unwrap();

        prop_assert_eq!(layout.element_bytes(), elem);
        prop_assert_eq!(layout.row_bytes(), row);
        prop_assert_eq!(layout.stride(), row + padding);
        prop_assert_eq!(layout.byte_len(), (row + padding) * (height as usize - 1) + row);

        let shape = layout.shape();
        let strides = layout.strides();
        prop_assert_eq!(shape.len(), layout.ndim());
        prop_assert_eq!(strides.len(), layout.ndim());
        prop_assert_eq!(strides[0], row + padding);
        prop_assert_eq!(*strides.last().unwrap(), elem);
        if channels == 1 {
            prop_assert_eq!(shape, vec![height as usize, width as usize]);
        } else {
            prop_assert_eq!(shape, vec![height as usize, width as usize, channels]);
            prop_assert_eq!(strides[1], channels * elem);
        }

        // The last addressable sample ends exactly at byte_len.
        let last = strides
            .iter()
            .zip(layout.shape())
            .map(|(s, n)| s * (n - 1))
            .sum::<usize>()
            + elem;
        prop_assert_eq!(last, layout.byte_len());
    }

    #[test]
    fn short_strides_are_rejected(
        width in 1u32..=256,
        channels in 1usize..=4,
        shortfall in 1usize..=8,
    ) {
        let row = width as usize * channels;
        prop_assume!(row >= shortfall);
        prop_assert!(PlaneLayout::new(width, 4, 8, channels, row - shortfall).is_err());
    }

    #[test]
    fn interleaved_planes_report_multiplicity(
        (chroma, channels, bits) in interleaved_chroma(),
        width in 1u32..=64,
        height in 1u32..=64,
    ) {
        let mut image = HeifImage::new(width, height, Colorspace::Rgb, chroma).unwrap();
        image.add_plane(Channel::Interleaved, width, height, bits).unwrap();
        let plane = image.plane(Channel::Interleaved).unwrap();
        let desc = plane.descriptor();

        prop_assert_eq!(desc.ndim, 3);
        prop_assert_eq!(desc.shape, vec![height as usize, width as usize, channels]);
        let expected_format = if bits > 8 { SampleFormat::U16 } else { SampleFormat::U8 };
        prop_assert_eq!(desc.format, expected_format);
        prop_assert!(desc.strides[0] >= width as usize * channels * desc.item_size);
    }

    #[test]
    fn packed_writes_read_back(
        width in 1u32..=48,
        height in 1u32..=48,
        bits in prop_oneof![Just(8u8), Just(10), Just(16)],
        seed in any::<u8>(),
    ) {
        let mut image = HeifImage::new(width, height, Colorspace::Monochrome, Chroma::Monochrome).unwrap();
        image.add_plane(Channel::Y, width, height, bits).unwrap();

        let elem = if bits > 8 { 2 } else { 1 };
        let len = width as usize * height as usize * elem;
        let packed: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect();

        image.plane_mut(Channel::Y).unwrap().copy_from_packed(&packed).unwrap();
        let view = image.plane(Channel::Y).unwrap();
        prop_assert_eq!(view.to_packed(), packed);
        prop_assert_eq!(view.data().len(), view.layout().byte_len());
    }
}
