// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! C-compatible types for the reconstruction API.

use std::ptr;

/// Status codes returned by reconstruction functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JxrStatus {
    /// The artifact was reconstructed.
    Success = 0,
    /// Invalid argument passed to function.
    InvalidArgument = 1,
    /// The decoder refused the event subscription.
    SubscriptionFailure = 2,
    /// The decoder refused an output buffer.
    BufferAttachFailure = 3,
    /// The input is invalid or corrupted. Call `jxr_get_last_error` for details.
    DecodeError = 4,
    /// The decoder misbehaved. Call `jxr_get_last_error` for details.
    ProtocolViolation = 5,
    /// The input holds no reconstructible artifact.
    UnsupportedArtifact = 6,
    /// The output buffer reached its size limit.
    BufferLimitExceeded = 7,
}

/// Signature check result.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JxrSignature {
    /// Not enough data to determine.
    NotEnoughBytes = 0,
    /// Not a JPEG XL file.
    Invalid = 1,
    /// Valid JPEG XL codestream.
    Codestream = 2,
    /// Valid JPEG XL container.
    Container = 3,
}

/// Output buffer options.
/// A field left at 0 uses the built-in default.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
#[allow(non_snake_case)]
pub struct JxrDecodeOptions {
    /// Capacity of the first output window in bytes (default 4096).
    pub InitialCapacity: usize,
    /// Maximum output buffer capacity in bytes (default: no limit).
    pub MaxCapacity: usize,
}

/// A reconstructed artifact owned by the library.
/// Must be released with `jxr_artifact_free`.
/// Fields are ordered by size (largest first) to minimize padding.
#[repr(C)]
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct JxrArtifact {
    /// Reconstructed bytes, or null when empty.
    pub Data: *mut u8,
    /// Length of `Data` in bytes.
    pub Length: usize,
    /// ICC profile, or null when the decoder reported none.
    pub ColorProfile: *mut u8,
    /// Length of `ColorProfile` in bytes.
    pub ColorProfileLength: usize,
    /// Image width in pixels, 0 if unknown.
    pub Width: u32,
    /// Image height in pixels, 0 if unknown.
    pub Height: u32,
}

impl Default for JxrArtifact {
    fn default() -> Self {
        Self {
            Data: ptr::null_mut(),
            Length: 0,
            ColorProfile: ptr::null_mut(),
            ColorProfileLength: 0,
            Width: 0,
            Height: 0,
        }
    }
}
