// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Replay engine for tests: emits a programmed sequence of statuses and writes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::engine::{BasicInfo, DecodeEngine, DecodeStatus, EventMask, OutputWindow};
use crate::error::EngineError;

/// One programmed engine action.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Return this status from `process_next`.
    Status(DecodeStatus),
    /// Write these bytes into the attached window(s), reporting
    /// `OutputBufferExhausted` whenever the window fills up.
    Write(Vec<u8>),
}

/// What the driver did to the engine, observable after the engine is gone.
#[derive(Debug, Default)]
pub(crate) struct Record {
    pub subscribed: Option<EventMask>,
    pub input: Vec<u8>,
    pub input_closed: bool,
    pub processed_with_open_input: bool,
    pub windows: Vec<OutputWindow>,
    pub releases: usize,
    pub dropped: bool,
}

pub(crate) struct ScriptedEngine {
    steps: VecDeque<Step>,
    window: Option<OutputWindow>,
    written: usize,
    accepted_events: EventMask,
    ignore_release: bool,
    info: Option<BasicInfo>,
    profile: Option<Vec<u8>>,
    record: Rc<RefCell<Record>>,
}

impl ScriptedEngine {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            window: None,
            written: 0,
            accepted_events: EventMask::ALL,
            ignore_release: false,
            info: None,
            profile: None,
            record: Rc::default(),
        }
    }

    /// Script for a single artifact: reconstruction, `bytes`, completion, success.
    pub fn artifact(bytes: Vec<u8>) -> Self {
        Self::new([
            Step::Status(DecodeStatus::BasicInfoReady),
            Step::Status(DecodeStatus::ReconstructionStarted),
            Step::Write(bytes),
            Step::Status(DecodeStatus::FullArtifactReady),
            Step::Status(DecodeStatus::Success),
        ])
    }

    /// Only these events can be subscribed; anything more is rejected.
    pub fn accepting(mut self, events: EventMask) -> Self {
        self.accepted_events = events;
        self
    }

    /// Keeps windows attached on release, so every later attach is refused.
    pub fn ignoring_release(mut self) -> Self {
        self.ignore_release = true;
        self
    }

    /// Starts with a window already attached, so the first attach is refused.
    pub fn with_stale_window(mut self) -> Self {
        self.window = Some(OutputWindow::new(0, 0));
        self
    }

    pub fn with_basic_info(mut self, width: u32, height: u32) -> Self {
        self.info = Some(BasicInfo { width, height });
        self
    }

    pub fn with_color_profile(mut self, profile: Vec<u8>) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn record(&self) -> Rc<RefCell<Record>> {
        Rc::clone(&self.record)
    }
}

impl DecodeEngine for ScriptedEngine {
    fn subscribe_events(&mut self, events: EventMask) -> Result<(), EngineError> {
        if !self.accepted_events.contains(events) {
            return Err(EngineError::UnsupportedEvents(
                events.bits() & !self.accepted_events.bits(),
            ));
        }
        self.record.borrow_mut().subscribed = Some(events);
        Ok(())
    }

    fn set_input(&mut self, input: &[u8]) {
        self.record.borrow_mut().input.extend_from_slice(input);
    }

    fn close_input(&mut self) {
        self.record.borrow_mut().input_closed = true;
    }

    fn set_output_window(&mut self, window: OutputWindow) -> Result<(), EngineError> {
        if self.window.is_some() {
            return Err(EngineError::WindowAlreadyAttached);
        }
        self.window = Some(window);
        self.written = 0;
        self.record.borrow_mut().windows.push(window);
        Ok(())
    }

    fn process_next(&mut self, output: &mut [u8]) -> DecodeStatus {
        if !self.record.borrow().input_closed {
            self.record.borrow_mut().processed_with_open_input = true;
        }

        loop {
            match self.steps.front_mut() {
                None => return DecodeStatus::Error,
                Some(Step::Status(status)) => {
                    let status = *status;
                    self.steps.pop_front();
                    return status;
                }
                Some(Step::Write(bytes)) => {
                    let Some(window) = self.window else {
                        return DecodeStatus::Error;
                    };
                    let count = (window.len - self.written).min(bytes.len());
                    let start = self.written;
                    let Some(target) = output.get_mut(start..start + count) else {
                        return DecodeStatus::Error;
                    };
                    target.copy_from_slice(&bytes[..count]);
                    bytes.drain(..count);
                    self.written += count;

                    if !bytes.is_empty() {
                        return DecodeStatus::OutputBufferExhausted;
                    }
                    self.steps.pop_front();
                }
            }
        }
    }

    fn release_output_window(&mut self) -> usize {
        self.record.borrow_mut().releases += 1;
        let Some(window) = self.window else {
            return 0;
        };
        let unused = window.len - self.written;
        if !self.ignore_release {
            self.window = None;
            self.written = 0;
        }
        unused
    }

    fn basic_info(&self) -> Option<BasicInfo> {
        self.info
    }

    fn color_profile(&self) -> Option<Vec<u8>> {
        self.profile.clone()
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        self.record.borrow_mut().dropped = true;
    }
}

/// Deterministic test payload: `len` bytes of a repeating non-trivial pattern.
pub(crate) fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}
