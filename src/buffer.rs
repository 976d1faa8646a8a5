// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Growable output buffer handed to the engine one window at a time.

use std::ops::Range;

use crate::engine::{DecodeEngine, OutputWindow};
use crate::error::DecodeFailure;

/// Capacity of the first window handed to the engine.
pub const DEFAULT_INITIAL_CAPACITY: usize = 4096;

/// Largest capacity a Rust allocation can have.
pub const DEFAULT_MAX_CAPACITY: usize = isize::MAX as usize;

/// Contiguous output storage that doubles whenever the engine runs out of room.
///
/// The engine only ever sees the window after the committed bytes, so growth
/// never moves or overwrites data it already produced.
#[derive(Debug)]
pub struct GrowableOutputBuffer {
    /// Backing storage; its length is the capacity.
    storage: Vec<u8>,
    /// Bytes written by the engine that must survive growth.
    committed: usize,
    /// Length of the window currently attached to the engine.
    granted: Option<usize>,
    /// Growth stops with `BufferLimitExceeded` past this capacity.
    max_capacity: usize,
    /// Number of completed growth steps.
    growth_count: usize,
}

impl GrowableOutputBuffer {
    /// Creates a buffer with the default capacity limit.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_limit(initial_capacity, DEFAULT_MAX_CAPACITY)
    }

    /// Creates a buffer that refuses to grow past `max_capacity`.
    ///
    /// An initial capacity of 0 is raised to 1 so that doubling always grows.
    pub fn with_limit(initial_capacity: usize, max_capacity: usize) -> Self {
        let capacity = initial_capacity.max(1);
        Self {
            storage: vec![0; capacity],
            committed: 0,
            granted: None,
            max_capacity: max_capacity.max(capacity),
            growth_count: 0,
        }
    }

    /// Current capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes committed so far.
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Number of growth steps taken.
    pub fn growth_count(&self) -> usize {
        self.growth_count
    }

    /// The free region after the committed bytes.
    pub fn window(&self) -> OutputWindow {
        OutputWindow::new(self.committed, self.capacity() - self.committed)
    }

    /// The committed bytes.
    pub fn committed_bytes(&self) -> &[u8] {
        &self.storage[..self.committed]
    }

    /// The free region lent to the engine during `process_next`.
    ///
    /// Committed bytes are never part of it, so an engine cannot reach them.
    pub fn window_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.committed..]
    }

    /// Attaches the free region to the engine as its write window.
    pub fn attach<E: DecodeEngine + ?Sized>(&mut self, engine: &mut E) -> Result<(), DecodeFailure> {
        let window = self.window();
        engine
            .set_output_window(window)
            .map_err(DecodeFailure::BufferAttachFailure)?;
        self.granted = Some(window.len);
        Ok(())
    }

    /// Detaches the window and commits what the engine wrote into it.
    ///
    /// Returns the number of bytes committed by this call.
    pub fn release<E: DecodeEngine + ?Sized>(&mut self, engine: &mut E) -> Result<usize, DecodeFailure> {
        let unused = engine.release_output_window();
        let Some(granted) = self.granted.take() else {
            return Ok(0);
        };

        let written = granted.checked_sub(unused).ok_or_else(|| {
            DecodeFailure::ProtocolViolation(format!(
                "engine reported {unused} unused bytes in a window of {granted}"
            ))
        })?;
        self.committed += written;
        Ok(written)
    }

    /// Commits the current window and attaches a new one after it, without growing.
    pub fn settle<E: DecodeEngine + ?Sized>(&mut self, engine: &mut E) -> Result<usize, DecodeFailure> {
        let written = self.release(engine)?;
        self.attach(engine)?;
        Ok(written)
    }

    /// Growth protocol: commit the written part of the window, double the
    /// capacity, and attach the enlarged free region.
    pub fn on_exhausted<E: DecodeEngine + ?Sized>(&mut self, engine: &mut E) -> Result<(), DecodeFailure> {
        let written = self.release(engine)?;
        let capacity = grown_capacity(self.capacity(), self.max_capacity)?;

        let additional = capacity - self.storage.len();
        self.storage
            .try_reserve_exact(additional)
            .map_err(|_| DecodeFailure::BufferLimitExceeded {
                capacity: self.capacity(),
            })?;
        self.storage.resize(capacity, 0);
        self.growth_count += 1;

        log::debug!(
            "output buffer grew to {} bytes ({} committed, {} written this round)",
            capacity,
            self.committed,
            written
        );

        self.attach(engine)
    }

    /// Consumes the buffer and returns the bytes in `range`.
    pub fn into_range(self, range: Range<usize>) -> Vec<u8> {
        let mut bytes = self.storage;
        bytes.truncate(range.end);
        bytes.drain(..range.start);
        bytes
    }
}

/// Capacity after one growth step: double, bounded by `limit`.
pub(crate) fn grown_capacity(current: usize, limit: usize) -> Result<usize, DecodeFailure> {
    match current.checked_mul(2) {
        Some(next) if next <= limit => Ok(next),
        _ => Err(DecodeFailure::BufferLimitExceeded { capacity: current }),
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
