// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! jxl-reconstruct - reconstruction driver for JPEG XL files.
//!
//! A [`DecodeEventLoop`] drives any [`DecodeEngine`] from input to a single
//! reconstructed artifact, growing its output buffer on demand. The
//! [`ContainerEngine`] reconstructs Brotli-compressed boxes from JPEG XL
//! containers. A C API is provided for FFI bindings to languages like C#.

mod buffer;
mod container;
mod driver;
mod engine;
mod error;
mod ffi;
mod types;

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod scripted;

pub use buffer::{DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY, GrowableOutputBuffer};
pub use container::{ContainerEngine, Signature, check_signature};
pub use driver::{Artifact, DecodeEventLoop, DecodeStats, DriverOptions, ResultSink};
pub use engine::{BasicInfo, DecodeEngine, DecodeStatus, EventMask, OutputWindow};
pub use error::{DecodeFailure, EngineError};
pub use ffi::*;
pub use types::*;

/// Reconstructs the artifact embedded in a JPEG XL file with default options.
pub fn reconstruct(input: &[u8]) -> Result<Artifact, DecodeFailure> {
    DecodeEventLoop::new(ContainerEngine::new()).run(input)
}

/// Decimal version component, evaluated at compile time.
const fn component(digits: &str) -> u32 {
    let digits = digits.as_bytes();
    let mut value = 0;
    let mut i = 0;
    while i < digits.len() {
        value = value * 10 + (digits[i] - b'0') as u32;
        i += 1;
    }
    value
}

/// Packed crate version, one byte per component, low byte zero.
const PACKED_VERSION: u32 = component(env!("CARGO_PKG_VERSION_MAJOR")) << 24
    | component(env!("CARGO_PKG_VERSION_MINOR")) << 16
    | component(env!("CARGO_PKG_VERSION_PATCH")) << 8;

/// Returns the library version as `(major << 24) | (minor << 16) | (patch << 8)`.
#[unsafe(no_mangle)]
pub extern "C" fn jxr_version() -> u32 {
    PACKED_VERSION
}
