#![no_main]

use heif_bridge::{Channel, Chroma, Colorspace, HeifContext};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut ctx) = HeifContext::new() else {
        return;
    };
    if ctx.read_from_memory(data.to_vec()).is_err() {
        return;
    }

    for id in ctx.get_list_of_top_level_image_ids() {
        let Ok(handle) = ctx.get_image_handle(id) else {
            continue;
        };
        // Bound decode work so the fuzzer spends its time in the parser.
        if u64::from(handle.width()) * u64::from(handle.height()) > 1 << 20 {
            continue;
        }
        if let Ok(ids) = handle.get_list_of_metadata_block_ids(None) {
            for block in ids {
                let _ = handle.get_metadata_block_type(block);
                let _ = handle.get_metadata_block(block);
            }
        }
        if let Ok(image) = handle.decode(Colorspace::Rgb, Chroma::InterleavedRgb) {
            if let Ok(plane) = image.plane(Channel::Interleaved) {
                let _ = plane.rows().map(|row| row.len()).sum::<usize>();
            }
        }
    }
});
