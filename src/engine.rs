// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Contract between the event loop and a decoding engine.
//!
//! An engine consumes the complete input, then reports its progress one
//! [`DecodeStatus`] at a time. Output is written into a window of the
//! caller's buffer, described by index rather than by pointer. Only the
//! window itself is lent to the engine, for the duration of each
//! [`DecodeEngine::process_next`] call; bytes before it are out of reach.

use std::ops::{BitOr, BitOrAssign, Range};

use crate::error::EngineError;

// ============================================================================
// Status Events
// ============================================================================

/// Status events emitted by an engine, one per `process_next` call.
///
/// Numeric codes follow the JPEG XL reference decoder so that engines bridged
/// from a numeric API can be mapped with [`DecodeStatus::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStatus {
    /// Decoding finished; no further events follow.
    Success,
    /// The input is invalid or corrupted.
    Error,
    /// The engine wants more input.
    NeedMoreInput,
    /// Basic image information (dimensions) is available.
    BasicInfoReady,
    /// The color encoding / profile is available.
    ColorEncodingReady,
    /// The engine wants a decoded-pixel buffer.
    ImageOutputBufferNeeded,
    /// One complete artifact has been written to the output window.
    FullArtifactReady,
    /// The engine found embedded reconstruction data and starts writing it.
    ReconstructionStarted,
    /// The output window is full; more space is required to continue.
    OutputBufferExhausted,
    /// A status code this crate does not know.
    Unrecognized(u32),
}

impl DecodeStatus {
    /// Maps a numeric status code to a status.
    ///
    /// Unknown codes are preserved as [`DecodeStatus::Unrecognized`].
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => DecodeStatus::Success,
            1 => DecodeStatus::Error,
            2 => DecodeStatus::NeedMoreInput,
            5 => DecodeStatus::ImageOutputBufferNeeded,
            6 => DecodeStatus::OutputBufferExhausted,
            0x40 => DecodeStatus::BasicInfoReady,
            0x100 => DecodeStatus::ColorEncodingReady,
            0x1000 => DecodeStatus::FullArtifactReady,
            0x2000 => DecodeStatus::ReconstructionStarted,
            other => DecodeStatus::Unrecognized(other),
        }
    }

    /// Returns the numeric status code.
    pub fn code(self) -> u32 {
        match self {
            DecodeStatus::Success => 0,
            DecodeStatus::Error => 1,
            DecodeStatus::NeedMoreInput => 2,
            DecodeStatus::ImageOutputBufferNeeded => 5,
            DecodeStatus::OutputBufferExhausted => 6,
            DecodeStatus::BasicInfoReady => 0x40,
            DecodeStatus::ColorEncodingReady => 0x100,
            DecodeStatus::FullArtifactReady => 0x1000,
            DecodeStatus::ReconstructionStarted => 0x2000,
            DecodeStatus::Unrecognized(code) => code,
        }
    }
}

// ============================================================================
// Event Subscription
// ============================================================================

/// Set of event kinds an engine should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventMask(u32);

impl EventMask {
    /// No events.
    pub const NONE: Self = Self(0);
    /// Basic image information.
    pub const BASIC_INFO: Self = Self(1 << 0);
    /// Color encoding.
    pub const COLOR_ENCODING: Self = Self(1 << 1);
    /// Requests for a decoded-pixel buffer.
    pub const IMAGE_OUT_BUFFER: Self = Self(1 << 2);
    /// Completion of each artifact.
    pub const FULL_ARTIFACT: Self = Self(1 << 3);
    /// Start of embedded reconstruction.
    pub const RECONSTRUCTION: Self = Self(1 << 4);
    /// Every event kind.
    pub const ALL: Self = Self(0b1_1111);

    /// Builds a mask from raw bits, rejecting bits that name no event kind.
    pub fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Returns the raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every event in `other` is part of this mask.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no event is selected.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EventMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ============================================================================
// Output Window
// ============================================================================

/// Region of the output buffer an engine may write into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputWindow {
    /// Position of the window in the caller's buffer.
    pub offset: usize,
    /// Number of writable bytes.
    pub len: usize,
}

impl OutputWindow {
    /// Creates a window of `len` bytes starting at `offset`.
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Index one past the last writable byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The window as an index range.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Basic image information reported alongside [`DecodeStatus::BasicInfoReady`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicInfo {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

// ============================================================================
// Engine Trait
// ============================================================================

/// A staged, pull-based decoding engine.
///
/// Call order expected by engines: `subscribe_events`, `set_input`,
/// `close_input`, `set_output_window`, then `process_next` until a terminal
/// status. A window stays attached until `release_output_window`; attaching a
/// second window without releasing the first is rejected.
pub trait DecodeEngine {
    /// Selects the informational events the engine reports.
    fn subscribe_events(&mut self, events: EventMask) -> Result<(), EngineError>;

    /// Supplies input bytes. The engine keeps its own copy.
    fn set_input(&mut self, input: &[u8]);

    /// Declares that no further input will arrive.
    fn close_input(&mut self);

    /// Attaches the window the next bytes are written into.
    fn set_output_window(&mut self, window: OutputWindow) -> Result<(), EngineError>;

    /// Runs until the next event. `output` is the attached window's storage:
    /// index 0 is the window's first byte.
    fn process_next(&mut self, output: &mut [u8]) -> DecodeStatus;

    /// Detaches the current window and returns how many of its bytes were
    /// not written. Returns 0 when no window is attached.
    fn release_output_window(&mut self) -> usize;

    /// Basic information, once [`DecodeStatus::BasicInfoReady`] was reported.
    fn basic_info(&self) -> Option<BasicInfo> {
        None
    }

    /// ICC profile, once [`DecodeStatus::ColorEncodingReady`] was reported.
    fn color_profile(&self) -> Option<Vec<u8>> {
        None
    }

    /// Description of the last [`DecodeStatus::Error`].
    fn error_message(&self) -> Option<String> {
        None
    }
}

impl<E: DecodeEngine + ?Sized> DecodeEngine for Box<E> {
    fn subscribe_events(&mut self, events: EventMask) -> Result<(), EngineError> {
        (**self).subscribe_events(events)
    }

    fn set_input(&mut self, input: &[u8]) {
        (**self).set_input(input)
    }

    fn close_input(&mut self) {
        (**self).close_input()
    }

    fn set_output_window(&mut self, window: OutputWindow) -> Result<(), EngineError> {
        (**self).set_output_window(window)
    }

    fn process_next(&mut self, output: &mut [u8]) -> DecodeStatus {
        (**self).process_next(output)
    }

    fn release_output_window(&mut self) -> usize {
        (**self).release_output_window()
    }

    fn basic_info(&self) -> Option<BasicInfo> {
        (**self).basic_info()
    }

    fn color_profile(&self) -> Option<Vec<u8>> {
        (**self).color_profile()
    }

    fn error_message(&self) -> Option<String> {
        (**self).error_message()
    }
}
