// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Event loop that drives an engine to a reconstructed artifact.

use std::ops::Range;

use crate::buffer::{DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY, GrowableOutputBuffer};
use crate::engine::{DecodeEngine, DecodeStatus, EventMask};
use crate::error::DecodeFailure;

/// Events the loop subscribes to before handing over input.
const SUBSCRIBED_EVENTS: EventMask = EventMask::ALL;

// ============================================================================
// Options and Results
// ============================================================================

/// Output buffer policy for a decode run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Capacity of the first output window.
    pub initial_capacity: usize,
    /// Capacity past which growth fails with `BufferLimitExceeded`.
    pub max_capacity: usize,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl DriverOptions {
    /// Sets the capacity of the first output window.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the capacity past which growth fails.
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

/// Buffer statistics of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeStats {
    /// Number of times the output buffer doubled.
    pub growth_count: usize,
    /// Final output buffer capacity.
    pub capacity: usize,
    /// Total bytes committed by the engine.
    pub committed: usize,
}

/// A reconstructed artifact with its side-channel metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Artifact {
    /// The reconstructed bytes.
    pub bytes: Vec<u8>,
    /// Image width in pixels, 0 if the engine reported none.
    pub width: u32,
    /// Image height in pixels, 0 if the engine reported none.
    pub height: u32,
    /// ICC profile, if the engine reported one.
    pub color_profile: Option<Vec<u8>>,
    /// Output buffer statistics.
    pub stats: DecodeStats,
}

/// Consumer of a successful run's artifact.
pub trait ResultSink {
    type Error: From<DecodeFailure>;

    /// Receives the artifact. Called once, and only on success.
    fn accept(&mut self, artifact: Artifact) -> Result<(), Self::Error>;
}

// ============================================================================
// Event Loop
// ============================================================================

/// Owns one engine and drives it through a single decode.
///
/// `run` consumes the loop, so the engine and the output buffer are released
/// on every exit path.
pub struct DecodeEventLoop<E: DecodeEngine> {
    engine: E,
    options: DriverOptions,
}

impl<E: DecodeEngine> DecodeEventLoop<E> {
    /// Creates a loop with default options.
    pub fn new(engine: E) -> Self {
        Self::with_options(engine, DriverOptions::default())
    }

    /// Creates a loop with the given options.
    pub fn with_options(engine: E, options: DriverOptions) -> Self {
        Self { engine, options }
    }

    /// Decodes `input` and returns the most recent complete artifact.
    ///
    /// The whole input is handed over up front and closed, so a request for
    /// more input is a protocol violation. The loop has no timeout: an engine
    /// that never reaches a terminal status keeps it running.
    pub fn run(mut self, input: &[u8]) -> Result<Artifact, DecodeFailure> {
        let result = self.drive(input);
        if let Err(ref failure) = result {
            log::warn!("decode failed: {}", failure);
        }
        result
    }

    /// Decodes `input` and hands the artifact to `sink` on success.
    pub fn run_into<S: ResultSink>(self, input: &[u8], sink: &mut S) -> Result<(), S::Error> {
        let artifact = self.run(input)?;
        sink.accept(artifact)
    }

    fn drive(&mut self, input: &[u8]) -> Result<Artifact, DecodeFailure> {
        let engine = &mut self.engine;

        engine
            .subscribe_events(SUBSCRIBED_EVENTS)
            .map_err(DecodeFailure::SubscriptionFailure)?;

        engine.set_input(input);
        engine.close_input();

        let mut buffer =
            GrowableOutputBuffer::with_limit(self.options.initial_capacity, self.options.max_capacity);
        buffer.attach(engine)?;

        let mut artifact = Artifact::default();
        let mut artifact_start = 0;
        let mut latest: Option<Range<usize>> = None;

        loop {
            let status = engine.process_next(buffer.window_mut());
            log::trace!("status {:#x} ({:?})", status.code(), status);

            match status {
                DecodeStatus::Error => {
                    let message = engine
                        .error_message()
                        .unwrap_or_else(|| "engine reported an error".to_string());
                    return Err(DecodeFailure::DecodeError(message));
                }
                DecodeStatus::NeedMoreInput => {
                    return Err(DecodeFailure::ProtocolViolation(
                        "more input requested after all input was provided".to_string(),
                    ));
                }
                DecodeStatus::BasicInfoReady => {
                    if let Some(info) = engine.basic_info() {
                        log::debug!("basic info: {}x{}", info.width, info.height);
                        artifact.width = info.width;
                        artifact.height = info.height;
                    }
                }
                DecodeStatus::ColorEncodingReady => {
                    artifact.color_profile = engine.color_profile();
                    log::debug!(
                        "color encoding ready ({} byte profile)",
                        artifact.color_profile.as_ref().map_or(0, Vec::len)
                    );
                }
                DecodeStatus::ImageOutputBufferNeeded => {
                    return Err(DecodeFailure::UnsupportedArtifact);
                }
                DecodeStatus::FullArtifactReady => {
                    buffer.settle(engine)?;
                    let range = artifact_start..buffer.committed();
                    log::debug!("full artifact ready ({} bytes)", range.len());
                    artifact_start = range.end;
                    latest = Some(range);
                }
                DecodeStatus::ReconstructionStarted => {
                    log::debug!("reconstruction started");
                }
                DecodeStatus::OutputBufferExhausted => {
                    buffer.on_exhausted(engine)?;
                }
                DecodeStatus::Success => {
                    buffer.release(engine)?;
                    artifact.stats = DecodeStats {
                        growth_count: buffer.growth_count(),
                        capacity: buffer.capacity(),
                        committed: buffer.committed(),
                    };
                    let range = latest.unwrap_or(0..buffer.committed());
                    artifact.bytes = buffer.into_range(range);
                    return Ok(artifact);
                }
                DecodeStatus::Unrecognized(code) => {
                    return Err(DecodeFailure::ProtocolViolation(format!(
                        "unrecognized decoder status {code:#x}"
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
