// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Builders for JPEG XL test files.

use std::io::Cursor;

/// 8x8 image, small encoding, no aspect ratio.
pub(crate) const CODESTREAM_8X8: [u8; 4] = [0xFF, 0x0A, 0x01, 0x00];
/// 64x32 image, small encoding, explicit width.
pub(crate) const CODESTREAM_64X32: [u8; 4] = [0xFF, 0x0A, 0x07, 0x0E];
/// 32x16 image, small encoding, 2:1 aspect ratio.
pub(crate) const CODESTREAM_32X16: [u8; 4] = [0xFF, 0x0A, 0xC3, 0x01];
/// 100x100 image, large encoding, 1:1 aspect ratio.
pub(crate) const CODESTREAM_100X100: [u8; 4] = [0xFF, 0x0A, 0x18, 0x13];

const JXL_SIGNATURE: &[u8; 12] = b"\x00\x00\x00\x0CJXL \x0D\x0A\x87\x0A";

/// Serializes a box with a 32-bit size.
pub(crate) fn isobmff_box(box_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(8 + data.len());
    result.extend_from_slice(&((8 + data.len()) as u32).to_be_bytes());
    result.extend_from_slice(box_type);
    result.extend_from_slice(data);
    result
}

/// Serializes a box with a 64-bit extended size.
pub(crate) fn extended_box(box_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(16 + data.len());
    result.extend_from_slice(&1u32.to_be_bytes());
    result.extend_from_slice(box_type);
    result.extend_from_slice(&((16 + data.len()) as u64).to_be_bytes());
    result.extend_from_slice(data);
    result
}

fn brotli_compress(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::new();
    let params = brotli::enc::BrotliEncoderParams::default();
    brotli::BrotliCompress(&mut Cursor::new(data), &mut output, &params).expect("Brotli compression failed");
    output
}

/// A brob box: inner type followed by the Brotli-compressed payload.
pub(crate) fn brob_box(inner_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut content = inner_type.to_vec();
    content.extend_from_slice(&brotli_compress(data));
    isobmff_box(b"brob", &content)
}

/// Signature and ftyp box followed by `boxes`.
pub(crate) fn container(boxes: &[Vec<u8>]) -> Vec<u8> {
    let mut result = JXL_SIGNATURE.to_vec();
    result.extend_from_slice(&isobmff_box(b"ftyp", b"jxl \x00\x00\x00\x00jxl "));
    for b in boxes {
        result.extend_from_slice(b);
    }
    result
}
