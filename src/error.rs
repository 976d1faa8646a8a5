// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Error types for the reconstruction driver.

/// Rejections reported by an engine through the [`DecodeEngine`](crate::DecodeEngine) contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The subscription named event kinds the engine cannot report.
    #[error("unsupported event subscription: {0:#x}")]
    UnsupportedEvents(u32),

    /// A window was attached while another one was still attached.
    #[error("an output window is already attached")]
    WindowAlreadyAttached,
}

/// Terminal failures of a decode run.
///
/// ```text
///   DecodeFailure
///   ├── SubscriptionFailure   ← engine refused the event subscription
///   ├── BufferAttachFailure   ← engine refused an output window
///   ├── DecodeError           ← engine reported a corrupt or invalid input
///   ├── ProtocolViolation     ← status impossible given the driver's state
///   ├── UnsupportedArtifact   ← engine wants a decoded-pixel buffer
///   └── BufferLimitExceeded   ← output buffer cannot grow any further
/// ```
///
/// None of these are retried within a run; a retry starts a fresh decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeFailure {
    /// The engine rejected the event subscription.
    #[error("event subscription failed: {0}")]
    SubscriptionFailure(#[source] EngineError),

    /// The engine rejected an output window.
    #[error("attaching the output buffer failed: {0}")]
    BufferAttachFailure(#[source] EngineError),

    /// The engine reported an invalid or corrupted bitstream.
    #[error("decoder error: {0}")]
    DecodeError(String),

    /// The engine emitted a status that cannot occur at this point, or one
    /// this crate does not know.
    #[error("decoder protocol violation: {0}")]
    ProtocolViolation(String),

    /// The engine asked for a decoded-pixel buffer: the input holds pixels,
    /// not an embedded artifact.
    #[error("input holds no reconstructible artifact (decoder requested a pixel buffer)")]
    UnsupportedArtifact,

    /// Growing the output buffer past `capacity` bytes is not possible.
    #[error("output buffer cannot grow beyond {capacity} bytes")]
    BufferLimitExceeded { capacity: usize },
}
