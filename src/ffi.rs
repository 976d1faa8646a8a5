// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! C API over the decode event loop and the container engine.

use std::cell::RefCell;
use std::ffi::c_char;
use std::ptr;
use std::slice;

use crate::buffer::{DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY};
use crate::container::{ContainerEngine, Signature, check_signature};
use crate::driver::{Artifact, DecodeEventLoop, DriverOptions};
use crate::error::DecodeFailure;
use crate::types::*;

// ============================================================================
// Last Error
// ============================================================================

/// The most recent failure on this thread.
struct Failure {
    status: JxrStatus,
    message: String,
}

thread_local! {
    static LAST_FAILURE: RefCell<Option<Failure>> = const { RefCell::new(None) };
}

/// Records a failure for the current thread and returns its status.
pub(crate) fn fail(status: JxrStatus, message: impl Into<String>) -> JxrStatus {
    let message = message.into();
    LAST_FAILURE.with(|slot| *slot.borrow_mut() = Some(Failure { status, message }));
    status
}

/// Forgets the failure recorded for the current thread.
pub(crate) fn forget_failure() {
    LAST_FAILURE.with(|slot| *slot.borrow_mut() = None);
}

/// Copies `message` into a C string buffer, truncating to fit, and returns
/// the full message length.
///
/// # Safety
/// `buffer` must be null or valid for writes of `capacity` bytes.
unsafe fn write_c_string(message: &str, buffer: *mut c_char, capacity: usize) -> usize {
    if buffer.is_null() || capacity == 0 {
        return message.len();
    }
    let target = unsafe { slice::from_raw_parts_mut(buffer as *mut u8, capacity) };
    let (text, terminator) = target.split_at_mut(message.len().min(capacity - 1));
    text.copy_from_slice(&message.as_bytes()[..text.len()]);
    terminator[0] = 0;
    message.len()
}

/// Gets the message of the last failed call on this thread.
///
/// # Arguments
/// * `buffer` - Receives the null-terminated message, truncated to fit.
/// * `buffer_size` - Size of the buffer in bytes.
///
/// # Returns
/// The length of the full message, excluding the terminator, or 0 if the
/// last call succeeded. Passing a null buffer only queries the length.
///
/// # Safety
/// The buffer must be null or valid for writes of `buffer_size` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jxr_get_last_error(buffer: *mut c_char, buffer_size: usize) -> usize {
    LAST_FAILURE.with(|slot| {
        let slot = slot.borrow();
        let message = slot.as_ref().map_or("", |failure| failure.message.as_str());
        unsafe { write_c_string(message, buffer, buffer_size) }
    })
}

/// Gets the status of the last failed call on this thread, or `Success` if
/// nothing failed since the last clear.
#[unsafe(no_mangle)]
pub extern "C" fn jxr_get_last_status() -> JxrStatus {
    LAST_FAILURE.with(|slot| slot.borrow().as_ref().map_or(JxrStatus::Success, |failure| failure.status))
}

/// Clears the recorded failure.
#[unsafe(no_mangle)]
pub extern "C" fn jxr_clear_last_error() {
    forget_failure();
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&JxrDecodeOptions> for DriverOptions {
    fn from(options: &JxrDecodeOptions) -> Self {
        let or_default = |value: usize, default: usize| if value == 0 { default } else { value };
        DriverOptions::default()
            .with_initial_capacity(or_default(options.InitialCapacity, DEFAULT_INITIAL_CAPACITY))
            .with_max_capacity(or_default(options.MaxCapacity, DEFAULT_MAX_CAPACITY))
    }
}

impl From<&DecodeFailure> for JxrStatus {
    fn from(failure: &DecodeFailure) -> Self {
        match failure {
            DecodeFailure::SubscriptionFailure(_) => JxrStatus::SubscriptionFailure,
            DecodeFailure::BufferAttachFailure(_) => JxrStatus::BufferAttachFailure,
            DecodeFailure::DecodeError(_) => JxrStatus::DecodeError,
            DecodeFailure::ProtocolViolation(_) => JxrStatus::ProtocolViolation,
            DecodeFailure::UnsupportedArtifact => JxrStatus::UnsupportedArtifact,
            DecodeFailure::BufferLimitExceeded { .. } => JxrStatus::BufferLimitExceeded,
        }
    }
}

impl From<Signature> for JxrSignature {
    fn from(signature: Signature) -> Self {
        match signature {
            Signature::NotEnoughBytes => JxrSignature::NotEnoughBytes,
            Signature::Invalid => JxrSignature::Invalid,
            Signature::Codestream => JxrSignature::Codestream,
            Signature::Container => JxrSignature::Container,
        }
    }
}

/// Hands `bytes` over to the caller. Empty buffers become null.
fn into_raw_bytes(bytes: Vec<u8>) -> (*mut u8, usize) {
    if bytes.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let boxed = bytes.into_boxed_slice();
    let len = boxed.len();
    (Box::into_raw(boxed) as *mut u8, len)
}

/// Reclaims a buffer produced by `into_raw_bytes`.
///
/// # Safety
/// `data` and `len` must come from one `into_raw_bytes` call, freed once.
unsafe fn free_raw_bytes(data: *mut u8, len: usize) {
    if !data.is_null() {
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(data, len)));
        }
    }
}

impl From<Artifact> for JxrArtifact {
    fn from(artifact: Artifact) -> Self {
        let (data, length) = into_raw_bytes(artifact.bytes);
        let (profile, profile_length) = into_raw_bytes(artifact.color_profile.unwrap_or_default());
        JxrArtifact {
            Data: data,
            Length: length,
            ColorProfile: profile,
            ColorProfileLength: profile_length,
            Width: artifact.width,
            Height: artifact.height,
        }
    }
}

// ============================================================================
// Reconstruction
// ============================================================================

/// Reconstructs the artifact embedded in a JPEG XL file.
///
/// The whole file is decoded in one call. On success `artifact` receives
/// library-owned buffers that must be released with `jxr_artifact_free`.
/// On failure `artifact` is zeroed and the reason is available through
/// `jxr_get_last_error`.
///
/// # Arguments
/// * `data` - The complete file contents.
/// * `size` - Length of `data` in bytes.
/// * `options` - Output buffer options, or null to use defaults.
/// * `artifact` - Receives the reconstructed artifact.
///
/// # Safety
/// - `data` must be valid for reads of `size` bytes.
/// - `options`, if not null, must point to a valid `JxrDecodeOptions`.
/// - `artifact` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jxr_reconstruct(
    data: *const u8,
    size: usize,
    options: *const JxrDecodeOptions,
    artifact: *mut JxrArtifact,
) -> JxrStatus {
    forget_failure();

    let Some(out) = (unsafe { artifact.as_mut() }) else {
        return fail(JxrStatus::InvalidArgument, "Null artifact pointer");
    };
    *out = JxrArtifact::default();

    if data.is_null() && size > 0 {
        return fail(JxrStatus::InvalidArgument, "Null data pointer with non-zero size");
    }

    let input: &[u8] = if size == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(data, size) }
    };

    let options = match unsafe { options.as_ref() } {
        Some(options) => DriverOptions::from(options),
        None => DriverOptions::default(),
    };

    match DecodeEventLoop::with_options(ContainerEngine::new(), options).run(input) {
        Ok(result) => {
            *out = JxrArtifact::from(result);
            JxrStatus::Success
        }
        Err(failure) => fail(JxrStatus::from(&failure), failure.to_string()),
    }
}

/// Releases the buffers of an artifact filled by `jxr_reconstruct`.
///
/// The artifact is zeroed afterwards, so freeing it twice is harmless.
///
/// # Safety
/// `artifact` must be null or point to an artifact filled by `jxr_reconstruct`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jxr_artifact_free(artifact: *mut JxrArtifact) {
    let Some(artifact) = (unsafe { artifact.as_mut() }) else {
        return;
    };
    unsafe {
        free_raw_bytes(artifact.Data, artifact.Length);
        free_raw_bytes(artifact.ColorProfile, artifact.ColorProfileLength);
    }
    *artifact = JxrArtifact::default();
}

// ============================================================================
// Signature Check
// ============================================================================

/// Checks if data appears to be a JPEG XL file.
///
/// Only needs the first 12 bytes to determine.
///
/// # Safety
/// `data` must be valid for reads of `size` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jxr_signature_check(data: *const u8, size: usize) -> JxrSignature {
    if data.is_null() || size == 0 {
        return JxrSignature::NotEnoughBytes;
    }

    let bytes = unsafe { slice::from_raw_parts(data, size) };
    check_signature(bytes).into()
}

#[cfg(test)]
#[path = "ffi_tests.rs"]
mod tests;
