// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Engine that walks JPEG XL files and reconstructs Brotli-compressed boxes.
//!
//! The engine never touches pixel data. It reads the codestream size header
//! for [`BasicInfo`], skips everything else, and streams the contents of each
//! `brob` box into the caller's output window. A file without such a box has
//! nothing to reconstruct, so it ends by asking for a pixel buffer.

use std::collections::VecDeque;
use std::io::{Cursor, Read};

use crate::engine::{BasicInfo, DecodeEngine, DecodeStatus, EventMask, OutputWindow};
use crate::error::EngineError;

/// Signature of a bare codestream.
const CODESTREAM_SIGNATURE: [u8; 2] = [0xFF, 0x0A];

/// Signature box that opens every container.
const CONTAINER_SIGNATURE: [u8; 12] = *b"\x00\x00\x00\x0CJXL \x0D\x0A\x87\x0A";

const BOX_TYPE_FTYP: [u8; 4] = *b"ftyp";
const BOX_TYPE_JXLC: [u8; 4] = *b"jxlc";
const BOX_TYPE_JXLP: [u8; 4] = *b"jxlp";
const BOX_TYPE_BROB: [u8; 4] = *b"brob";

/// Major brand required in the `ftyp` box.
const FTYP_BRAND: [u8; 4] = *b"jxl ";

/// Internal buffer size of the Brotli decompressor.
const BROTLI_BUFFER_SIZE: usize = 4096;

// ============================================================================
// Signature Check
// ============================================================================

/// Result of inspecting the first bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// Too few bytes to decide.
    NotEnoughBytes,
    /// Not a JPEG XL file.
    Invalid,
    /// A bare codestream.
    Codestream,
    /// A codestream wrapped in a box container.
    Container,
}

/// Classifies `data` by its leading bytes.
pub fn check_signature(data: &[u8]) -> Signature {
    match data.first() {
        None => Signature::NotEnoughBytes,
        Some(0xFF) => match data.get(1) {
            None => Signature::NotEnoughBytes,
            Some(&byte) if byte == CODESTREAM_SIGNATURE[1] => Signature::Codestream,
            Some(_) => Signature::Invalid,
        },
        Some(0x00) => {
            let seen = data.len().min(CONTAINER_SIGNATURE.len());
            if data[..seen] != CONTAINER_SIGNATURE[..seen] {
                Signature::Invalid
            } else if seen < CONTAINER_SIGNATURE.len() {
                Signature::NotEnoughBytes
            } else {
                Signature::Container
            }
        }
        Some(_) => Signature::Invalid,
    }
}

// ============================================================================
// Codestream Size Header
// ============================================================================

/// LSB-first bit reader over a byte slice.
struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Reads `count` bits (at most 32). Returns `None` past the end of data.
    fn read(&mut self, count: usize) -> Option<u32> {
        let mut value = 0u32;
        for i in 0..count {
            let byte = *self.data.get((self.position + i) / 8)?;
            let bit = (byte >> ((self.position + i) % 8)) & 1;
            value |= u32::from(bit) << i;
        }
        self.position += count;
        Some(value)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read(1).map(|bit| bit == 1)
    }

    /// Reads a dimension in the small (multiple of 8) or large encoding.
    fn read_dimension(&mut self, small: bool) -> Option<u32> {
        if small {
            return Some((self.read(5)? + 1) * 8);
        }
        let bits = match self.read(2)? {
            0 => 9,
            1 => 13,
            2 => 18,
            _ => 30,
        };
        Some(self.read(bits)? + 1)
    }
}

/// Fixed aspect ratios as (numerator, denominator), indexed by ratio - 1.
const ASPECT_RATIOS: [(u64, u64); 7] = [(1, 1), (12, 10), (4, 3), (3, 2), (16, 9), (5, 4), (2, 1)];

/// Parses the size header that follows the codestream signature.
///
/// Returns `None` if `header` ends before the size header does.
fn parse_size_header(header: &[u8]) -> Option<BasicInfo> {
    let mut reader = BitReader::new(header);
    let small = reader.read_bool()?;
    let height = reader.read_dimension(small)?;
    let ratio = reader.read(3)? as usize;

    let width = match ratio.checked_sub(1) {
        None => reader.read_dimension(small)?,
        Some(index) => {
            let (num, den) = ASPECT_RATIOS[index];
            u32::try_from(u64::from(height) * num / den).unwrap_or(u32::MAX)
        }
    };

    Some(BasicInfo { width, height })
}

// ============================================================================
// Container Engine
// ============================================================================

/// Why processing cannot continue right now.
enum Halt {
    /// The input ends early; fatal once input is closed.
    Truncated,
    /// The input is malformed.
    Invalid(String),
}

/// A box header located in the input.
struct BoxHeader {
    box_type: [u8; 4],
    payload_start: usize,
    end: usize,
}

enum Stage {
    Signature,
    Codestream,
    Boxes { offset: usize },
    Reconstructing {
        decoder: Box<brotli::Decompressor<Cursor<Vec<u8>>>>,
        next_box: usize,
    },
    Done(DecodeStatus),
}

/// Reconstruction engine over JPEG XL codestreams and containers.
pub struct ContainerEngine {
    input: Vec<u8>,
    input_closed: bool,
    events: EventMask,
    window: Option<OutputWindow>,
    written: usize,
    stage: Stage,
    pending: VecDeque<DecodeStatus>,
    info: Option<BasicInfo>,
    reconstructed: usize,
    error: Option<String>,
}

impl Default for ContainerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerEngine {
    pub fn new() -> Self {
        Self {
            input: Vec::new(),
            input_closed: false,
            events: EventMask::NONE,
            window: None,
            written: 0,
            stage: Stage::Signature,
            pending: VecDeque::new(),
            info: None,
            reconstructed: 0,
            error: None,
        }
    }

    /// Queues an informational event if it was subscribed.
    fn emit(&mut self, event: EventMask, status: DecodeStatus) {
        if self.events.contains(event) {
            self.pending.push_back(status);
        }
    }

    fn announce_basic_info(&mut self, info: BasicInfo) {
        if self.info.is_none() {
            log::debug!("codestream size header: {}x{}", info.width, info.height);
            self.info = Some(info);
            self.emit(EventMask::BASIC_INFO, DecodeStatus::BasicInfoReady);
        }
    }

    /// Status reported once every box has been read.
    fn final_status(&self) -> Result<DecodeStatus, Halt> {
        if self.info.is_none() {
            return Err(Halt::Invalid("no codestream found".to_string()));
        }
        if self.reconstructed > 0 {
            Ok(DecodeStatus::Success)
        } else if self.events.contains(EventMask::IMAGE_OUT_BUFFER) {
            Ok(DecodeStatus::ImageOutputBufferNeeded)
        } else {
            Ok(DecodeStatus::Success)
        }
    }

    /// Locates the box starting at `offset`, or `None` at the end of input.
    fn box_header(&self, offset: usize) -> Result<Option<BoxHeader>, Halt> {
        let data = &self.input;
        if offset == data.len() {
            return if self.input_closed {
                Ok(None)
            } else {
                Err(Halt::Truncated)
            };
        }

        let header = data.get(offset..offset + 8).ok_or(Halt::Truncated)?;
        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let box_type = [header[4], header[5], header[6], header[7]];

        let (header_size, box_size) = match size {
            0 => (8, data.len() - offset),
            1 => {
                let extended = data.get(offset + 8..offset + 16).ok_or(Halt::Truncated)?;
                let mut size = [0u8; 8];
                size.copy_from_slice(extended);
                let size = usize::try_from(u64::from_be_bytes(size))
                    .map_err(|_| Halt::Invalid("box size does not fit in memory".to_string()))?;
                (16, size)
            }
            size => (8, size as usize),
        };

        if box_size < header_size {
            return Err(Halt::Invalid(format!(
                "box '{}' at offset {} has invalid size {}",
                String::from_utf8_lossy(&box_type),
                offset,
                box_size
            )));
        }
        let end = offset.checked_add(box_size).ok_or(Halt::Truncated)?;
        if end > data.len() {
            return Err(Halt::Truncated);
        }

        Ok(Some(BoxHeader {
            box_type,
            payload_start: offset + header_size,
            end,
        }))
    }

    /// Handles the box at `offset` and moves on to the next stage.
    fn read_box(&mut self, offset: usize) -> Result<(), Halt> {
        let Some(header) = self.box_header(offset)? else {
            let status = self.final_status()?;
            self.stage = Stage::Done(status);
            return Ok(());
        };
        let payload = &self.input[header.payload_start..header.end];

        match header.box_type {
            BOX_TYPE_FTYP => {
                if payload.get(..4) != Some(&FTYP_BRAND[..]) {
                    return Err(Halt::Invalid("ftyp box does not name the jxl brand".to_string()));
                }
            }
            BOX_TYPE_JXLC | BOX_TYPE_JXLP if self.info.is_none() => {
                let codestream = if header.box_type == BOX_TYPE_JXLP {
                    payload
                        .get(4..)
                        .ok_or_else(|| Halt::Invalid("jxlp box is missing its index".to_string()))?
                } else {
                    payload
                };
                if codestream.get(..2) != Some(&CODESTREAM_SIGNATURE[..]) {
                    return Err(Halt::Invalid("codestream signature missing".to_string()));
                }
                let info = parse_size_header(&codestream[2..])
                    .ok_or_else(|| Halt::Invalid("codestream size header is truncated".to_string()))?;
                self.announce_basic_info(info);
            }
            BOX_TYPE_BROB => {
                let inner = payload
                    .get(..4)
                    .ok_or_else(|| Halt::Invalid("brob box is missing its inner type".to_string()))?;
                if [BOX_TYPE_JXLC, BOX_TYPE_JXLP, BOX_TYPE_BROB]
                    .iter()
                    .any(|forbidden| forbidden[..] == *inner)
                {
                    return Err(Halt::Invalid(format!(
                        "brob box cannot wrap '{}'",
                        String::from_utf8_lossy(inner)
                    )));
                }

                log::debug!(
                    "reconstructing '{}' box ({} compressed bytes)",
                    String::from_utf8_lossy(inner),
                    payload.len() - 4
                );
                let compressed = payload[4..].to_vec();
                self.stage = Stage::Reconstructing {
                    decoder: Box::new(brotli::Decompressor::new(Cursor::new(compressed), BROTLI_BUFFER_SIZE)),
                    next_box: header.end,
                };
                self.emit(EventMask::RECONSTRUCTION, DecodeStatus::ReconstructionStarted);
                return Ok(());
            }
            _ => {}
        }

        self.stage = Stage::Boxes { offset: header.end };
        Ok(())
    }

    /// Makes one unit of progress, queueing any statuses it produces.
    fn advance(&mut self, output: &mut [u8]) -> Result<(), Halt> {
        match self.stage {
            Stage::Signature => {
                self.stage = match check_signature(&self.input) {
                    Signature::NotEnoughBytes => return Err(Halt::Truncated),
                    Signature::Invalid => return Err(Halt::Invalid("not a JPEG XL file".to_string())),
                    Signature::Codestream => Stage::Codestream,
                    Signature::Container => Stage::Boxes {
                        offset: CONTAINER_SIGNATURE.len(),
                    },
                };
                Ok(())
            }
            Stage::Codestream => {
                let info = parse_size_header(&self.input[CODESTREAM_SIGNATURE.len()..]).ok_or(Halt::Truncated)?;
                self.announce_basic_info(info);
                let status = self.final_status()?;
                self.stage = Stage::Done(status);
                Ok(())
            }
            Stage::Boxes { offset } => self.read_box(offset),
            Stage::Reconstructing {
                ref mut decoder,
                next_box,
            } => {
                let Some(window) = self.window else {
                    self.pending.push_back(DecodeStatus::OutputBufferExhausted);
                    return Ok(());
                };
                let lent = output.len();
                let target = output.get_mut(self.written..window.len).ok_or_else(|| {
                    Halt::Invalid(format!(
                        "output window of {} bytes lies outside the {} bytes lent",
                        window.len, lent
                    ))
                })?;
                if target.is_empty() {
                    self.pending.push_back(DecodeStatus::OutputBufferExhausted);
                    return Ok(());
                }

                match decoder.read(target) {
                    Ok(0) => {
                        self.reconstructed += 1;
                        self.stage = Stage::Boxes { offset: next_box };
                        self.emit(EventMask::FULL_ARTIFACT, DecodeStatus::FullArtifactReady);
                        Ok(())
                    }
                    Ok(count) => {
                        self.written += count;
                        Ok(())
                    }
                    Err(e) => Err(Halt::Invalid(format!("brob decompression failed: {}", e))),
                }
            }
            Stage::Done(status) => {
                self.pending.push_back(status);
                Ok(())
            }
        }
    }

    fn fail(&mut self, message: String) -> DecodeStatus {
        log::debug!("container engine error: {}", message);
        self.error = Some(message);
        self.pending.clear();
        self.stage = Stage::Done(DecodeStatus::Error);
        DecodeStatus::Error
    }
}

impl DecodeEngine for ContainerEngine {
    fn subscribe_events(&mut self, events: EventMask) -> Result<(), EngineError> {
        self.events = events;
        Ok(())
    }

    fn set_input(&mut self, input: &[u8]) {
        self.input.extend_from_slice(input);
    }

    fn close_input(&mut self) {
        self.input_closed = true;
    }

    fn set_output_window(&mut self, window: OutputWindow) -> Result<(), EngineError> {
        if self.window.is_some() {
            return Err(EngineError::WindowAlreadyAttached);
        }
        self.window = Some(window);
        self.written = 0;
        Ok(())
    }

    fn process_next(&mut self, output: &mut [u8]) -> DecodeStatus {
        loop {
            if let Some(status) = self.pending.pop_front() {
                return status;
            }
            match self.advance(output) {
                Ok(()) => {}
                Err(Halt::Truncated) if !self.input_closed => return DecodeStatus::NeedMoreInput,
                Err(Halt::Truncated) => return self.fail("unexpected end of input".to_string()),
                Err(Halt::Invalid(message)) => return self.fail(message),
            }
        }
    }

    fn release_output_window(&mut self) -> usize {
        let unused = self.window.take().map_or(0, |window| window.len - self.written);
        self.written = 0;
        unused
    }

    fn basic_info(&self) -> Option<BasicInfo> {
        self.info
    }

    fn error_message(&self) -> Option<String> {
        self.error.clone()
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
