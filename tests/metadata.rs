// tests/metadata.rs
//
// Exif / XMP / generic metadata blocks written and read back.

#[macro_use]
mod common;

use common::{gradient, heif_from_rgb};
use heif_bridge::{CompressionFormat, Encoder, HeifContext, ImageHandle};

/// Little-endian TIFF header with one IFD holding Orientation = 6.
fn exif_orientation_6() -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes()); // offset of IFD0
    tiff.extend_from_slice(&1u16.to_le_bytes()); // one entry
    tiff.extend_from_slice(&0x0112u16.to_le_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_le_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_le_bytes()); // count
    tiff.extend_from_slice(&6u16.to_le_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_le_bytes()); // no IFD1
    tiff
}

/// Encode a small image, let `attach` add metadata to it, then reopen the
/// serialised file and hand back its primary handle.
fn round_trip(
    format: CompressionFormat,
    attach: impl FnOnce(&mut HeifContext, &ImageHandle),
) -> (HeifContext, ImageHandle) {
    let mut ctx = HeifContext::new().unwrap();
    let mut encoder = Encoder::new(format).unwrap();
    let handle = encoder
        .encode_image(&mut ctx, &heif_from_rgb(&gradient(16, 16)), None)
        .unwrap();
    attach(&mut ctx, &handle);
    let bytes = ctx.write_to_bytes().unwrap();

    let mut reread = HeifContext::new().unwrap();
    reread.read_from_memory(bytes).unwrap();
    let handle = reread.get_primary_image_handle().unwrap();
    (reread, handle)
}

#[test]
fn exif_round_trip() {
    let format = require_codec!();
    let exif = exif_orientation_6();
    let (_ctx, handle) = round_trip(format, |ctx, h| ctx.add_exif_metadata(h, &exif).unwrap());

    let ids = handle.get_list_of_metadata_block_ids(None).unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(handle.get_metadata_block_type(ids[0]).unwrap(), "Exif");

    // Stored blocks start with the 4-byte offset of the TIFF header.
    let block = handle.get_metadata_block(ids[0]).unwrap();
    let offset = u32::from_be_bytes(block[..4].try_into().unwrap()) as usize;
    assert_eq!(&block[4 + offset..], exif.as_slice());

    let parsed = exif::Reader::new()
        .read_raw(block[4 + offset..].to_vec())
        .unwrap();
    let orientation = parsed
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0));
    assert_eq!(orientation, Some(6));
}

#[test]
fn exif_filter_selects_only_exif() {
    let format = require_codec!();
    let exif = exif_orientation_6();
    let (_ctx, handle) = round_trip(format, |ctx, h| {
        ctx.add_exif_metadata(h, &exif).unwrap();
        ctx.add_xmp_metadata(h, b"<x:xmpmeta xmlns:x='adobe:ns:meta/'/>")
            .unwrap();
    });

    assert_eq!(handle.get_list_of_metadata_block_ids(None).unwrap().len(), 2);
    let exif_ids = handle.get_list_of_metadata_block_ids(Some("Exif")).unwrap();
    assert_eq!(exif_ids.len(), 1);
    assert!(handle
        .get_list_of_metadata_block_ids(Some("uri "))
        .unwrap()
        .is_empty());
}

#[test]
fn xmp_bytes_are_preserved_exactly() {
    let format = require_codec!();
    let xmp = br#"<?xpacket begin=""?><x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF/></x:xmpmeta>"#;
    let (_ctx, handle) = round_trip(format, |ctx, h| ctx.add_xmp_metadata(h, xmp).unwrap());

    let ids = handle.get_list_of_metadata_block_ids(Some("mime")).unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(
        handle
            .get_metadata_block_content_type(ids[0])
            .unwrap()
            .as_deref(),
        Some("application/rdf+xml")
    );
    assert_eq!(handle.get_metadata_block(ids[0]).unwrap(), xmp.to_vec());
}

#[test]
fn generic_metadata_with_and_without_content_type() {
    let format = require_codec!();
    let (_ctx, handle) = round_trip(format, |ctx, h| {
        ctx.add_generic_metadata(h, b"{\"k\":1}", "mime", Some("application/json"))
            .unwrap();
        ctx.add_generic_metadata(h, b"urn:example", "uri ", None)
            .unwrap();
    });

    let mime = handle.get_list_of_metadata_block_ids(Some("mime")).unwrap();
    assert_eq!(mime.len(), 1);
    assert_eq!(
        handle.get_metadata_block_content_type(mime[0]).unwrap(),
        Some("application/json".to_string())
    );
    assert_eq!(handle.get_metadata_block(mime[0]).unwrap(), b"{\"k\":1}");

    let uri = handle.get_list_of_metadata_block_ids(Some("uri ")).unwrap();
    assert_eq!(uri.len(), 1);
    assert_eq!(handle.get_metadata_block_type(uri[0]).unwrap(), "uri ");
}

#[test]
fn unknown_block_id_is_reported() {
    let format = require_codec!();
    let (_ctx, handle) = round_trip(format, |_, _| {});
    assert!(handle.get_list_of_metadata_block_ids(None).unwrap().is_empty());
    let err = handle.get_metadata_block(424242).unwrap_err();
    assert_eq!(err.code(), Some(heif_bridge::HeifErrorCode::InvalidInput));
}
