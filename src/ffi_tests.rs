// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Unit tests for the C API.

use super::*;
use crate::error::EngineError;
use crate::fixtures::*;
use crate::scripted::pattern;

fn last_error() -> String {
    let mut buffer = [0 as c_char; 256];
    let len = unsafe { jxr_get_last_error(buffer.as_mut_ptr(), buffer.len()) };
    let bytes: Vec<u8> = buffer[..len.min(255)].iter().map(|&c| c as u8).collect();
    String::from_utf8(bytes).unwrap()
}

fn reconstruct(input: &[u8], options: Option<&JxrDecodeOptions>) -> (JxrStatus, JxrArtifact) {
    let mut artifact = JxrArtifact::default();
    let options = options.map_or(ptr::null(), |o| o as *const JxrDecodeOptions);
    let status = unsafe { jxr_reconstruct(input.as_ptr(), input.len(), options, &mut artifact) };
    (status, artifact)
}

#[test]
fn test_options_zero_means_default() {
    let options = DriverOptions::from(&JxrDecodeOptions::default());
    assert_eq!(options, DriverOptions::default());

    let options = DriverOptions::from(&JxrDecodeOptions {
        InitialCapacity: 1024,
        MaxCapacity: 65536,
    });
    assert_eq!(options.initial_capacity, 1024);
    assert_eq!(options.max_capacity, 65536);
}

#[test]
fn test_failure_status_mapping() {
    let cases = [
        (
            DecodeFailure::SubscriptionFailure(EngineError::UnsupportedEvents(1)),
            JxrStatus::SubscriptionFailure,
        ),
        (
            DecodeFailure::BufferAttachFailure(EngineError::WindowAlreadyAttached),
            JxrStatus::BufferAttachFailure,
        ),
        (DecodeFailure::DecodeError("bad".to_string()), JxrStatus::DecodeError),
        (DecodeFailure::ProtocolViolation("odd".to_string()), JxrStatus::ProtocolViolation),
        (DecodeFailure::UnsupportedArtifact, JxrStatus::UnsupportedArtifact),
        (
            DecodeFailure::BufferLimitExceeded { capacity: 1 },
            JxrStatus::BufferLimitExceeded,
        ),
    ];

    for (failure, status) in cases {
        assert_eq!(JxrStatus::from(&failure), status);
    }
}

#[test]
fn test_reconstruct_and_free() {
    let data = pattern(5000);
    let input = container(&[isobmff_box(b"jxlc", &CODESTREAM_64X32), brob_box(b"Exif", &data)]);

    let (status, mut artifact) = reconstruct(&input, None);

    assert_eq!(status, JxrStatus::Success);
    assert_eq!(artifact.Length, data.len());
    assert_eq!(unsafe { slice::from_raw_parts(artifact.Data, artifact.Length) }, data.as_slice());
    assert_eq!((artifact.Width, artifact.Height), (64, 32));
    assert!(artifact.ColorProfile.is_null());
    assert_eq!(artifact.ColorProfileLength, 0);

    unsafe {
        jxr_artifact_free(&mut artifact);
        jxr_artifact_free(&mut artifact);
        jxr_artifact_free(ptr::null_mut());
    }
    assert!(artifact.Data.is_null());
    assert_eq!(artifact.Length, 0);
}

#[test]
fn test_reconstruct_respects_max_capacity() {
    let input = container(&[isobmff_box(b"jxlc", &CODESTREAM_8X8), brob_box(b"Exif", &pattern(10000))]);
    let options = JxrDecodeOptions {
        InitialCapacity: 0,
        MaxCapacity: 8192,
    };

    let (status, artifact) = reconstruct(&input, Some(&options));

    assert_eq!(status, JxrStatus::BufferLimitExceeded);
    assert!(artifact.Data.is_null());
    assert_eq!(last_error(), "output buffer cannot grow beyond 8192 bytes");
}

#[test]
fn test_reconstruct_reports_decode_errors() {
    let (status, artifact) = reconstruct(b"not an image", None);

    assert_eq!(status, JxrStatus::DecodeError);
    assert!(artifact.Data.is_null());
    assert_eq!(last_error(), "decoder error: not a JPEG XL file");

    jxr_clear_last_error();
    assert_eq!(unsafe { jxr_get_last_error(ptr::null_mut(), 0) }, 0);
}

#[test]
fn test_reconstruct_without_artifact_is_unsupported() {
    let (status, _) = reconstruct(&CODESTREAM_8X8, None);
    assert_eq!(status, JxrStatus::UnsupportedArtifact);
}

#[test]
fn test_reconstruct_empty_input() {
    let status = unsafe { jxr_reconstruct(ptr::null(), 0, ptr::null(), &mut JxrArtifact::default()) };
    assert_eq!(status, JxrStatus::DecodeError);
}

#[test]
fn test_reconstruct_invalid_arguments() {
    let input = container(&[]);
    let status = unsafe { jxr_reconstruct(input.as_ptr(), input.len(), ptr::null(), ptr::null_mut()) };
    assert_eq!(status, JxrStatus::InvalidArgument);
    assert_eq!(last_error(), "Null artifact pointer");

    let status = unsafe { jxr_reconstruct(ptr::null(), 16, ptr::null(), &mut JxrArtifact::default()) };
    assert_eq!(status, JxrStatus::InvalidArgument);
}

#[test]
fn test_last_error_truncates() {
    fail(JxrStatus::DecodeError, "a long error message");

    let mut buffer = [0x7f as c_char; 8];
    let len = unsafe { jxr_get_last_error(buffer.as_mut_ptr(), buffer.len()) };

    assert_eq!(len, 20);
    assert_eq!(buffer[5] as u8, b'g');
    assert_eq!(buffer[7], 0);

    let mut single = [0x7f as c_char; 1];
    assert_eq!(unsafe { jxr_get_last_error(single.as_mut_ptr(), 1) }, 20);
    assert_eq!(single[0], 0);
}

#[test]
fn test_last_status_follows_failures() {
    jxr_clear_last_error();
    assert_eq!(jxr_get_last_status(), JxrStatus::Success);

    let (status, _) = reconstruct(b"not an image", None);
    assert_eq!(status, JxrStatus::DecodeError);
    assert_eq!(jxr_get_last_status(), JxrStatus::DecodeError);

    let input = container(&[isobmff_box(b"jxlc", &CODESTREAM_8X8), brob_box(b"Exif", b"ok")]);
    let (status, mut artifact) = reconstruct(&input, None);
    assert_eq!(status, JxrStatus::Success);
    assert_eq!(jxr_get_last_status(), JxrStatus::Success);
    assert_eq!(unsafe { jxr_get_last_error(ptr::null_mut(), 0) }, 0);
    unsafe { jxr_artifact_free(&mut artifact) };
}

#[test]
fn test_signature_check() {
    let container_file = container(&[]);
    unsafe {
        assert_eq!(jxr_signature_check(ptr::null(), 0), JxrSignature::NotEnoughBytes);
        assert_eq!(jxr_signature_check(CODESTREAM_8X8.as_ptr(), 4), JxrSignature::Codestream);
        assert_eq!(
            jxr_signature_check(container_file.as_ptr(), container_file.len()),
            JxrSignature::Container
        );
        assert_eq!(jxr_signature_check(b"GIF89a".as_ptr(), 6), JxrSignature::Invalid);
    }
}

#[test]
fn test_version_is_packed() {
    let version = crate::jxr_version();
    let expected: Vec<u32> = env!("CARGO_PKG_VERSION").split('.').map(|part| part.parse().unwrap()).collect();
    assert_eq!(version >> 24, expected[0]);
    assert_eq!((version >> 16) & 0xFF, expected[1]);
    assert_eq!((version >> 8) & 0xFF, expected[2]);
    assert_eq!(version & 0xFF, 0);
}
