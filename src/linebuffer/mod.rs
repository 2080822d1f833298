//! Line splitter for byte streams.
//!
//! [`LineBuffer`] accumulates bytes until a line feed arrives and then hands
//! the assembled line to a per-line callback. It is the buffering strategy
//! behind line-buffered requests, where a long-lived response (a streaming
//! feed, for example) is consumed one record per line.
//!
//! # Rules
//!
//! - **Line feed**: delivers the buffered line (without the terminator) and
//!   resets the buffer. A line that filled the whole capacity is treated as
//!   overflowed and discarded without a callback.
//! - **Printable ASCII** (`0x20..=0x7E`): appended while there is room.
//! - **Everything else** (carriage return, control bytes, non-ASCII): dropped.
//!
//! Overlong lines are never truncated and delivered; they are dropped whole.
//!
//! # Examples
//!
//! ```rust
//! use httpmux::linebuffer::LineBuffer;
//!
//! let mut lb = LineBuffer::new(64).unwrap();
//! let mut lines = Vec::new();
//!
//! lb.write(b"foo\r\nba", |line| lines.push(line.to_string())).unwrap();
//! lb.write(b"r\n", |line| lines.push(line.to_string())).unwrap();
//!
//! assert_eq!(lines, ["foo", "bar"]);
//! ```

use crate::network::error::Error;
use alloc::vec::Vec;

/// ASCII line feed character (0x0A).
pub const ASCII_LF: u8 = 0x0A;
/// ASCII space character (0x20), the first printable byte.
pub const ASCII_SPACE: u8 = 0x20;
/// ASCII tilde character (0x7E), the last printable byte.
pub const ASCII_TILDE: u8 = 0x7E;

/// An accumulator that splits a byte stream into lines.
///
/// The internal buffer is allocated once, at construction, with room for
/// `capacity` bytes plus one reserved slot. Lines shorter than `capacity`
/// are delivered; anything longer is discarded when its line feed arrives.
#[derive(Debug)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    capacity: usize,
    dropped_lines: usize,
}

impl LineBuffer {
    /// Create a line buffer holding lines of up to `capacity - 1` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the buffer cannot be allocated.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity.saturating_add(1))
            .map_err(|_| Error::OutOfMemory)?;
        Ok(Self {
            buffer,
            capacity,
            dropped_lines: 0,
        })
    }

    /// Feed `data` into the buffer, calling `per_line` for each completed line.
    ///
    /// Input may be split at arbitrary points across calls. Every byte is
    /// consumed; overflow is absorbed by dropping bytes.
    ///
    /// # Errors
    ///
    /// None today. The `Result` is part of the contract with the request
    /// adapter, which reports a failed write to the caller as
    /// [`Error::LineBuffer`], so a splitter that can fail slots in unchanged.
    pub fn write<F>(&mut self, data: &[u8], mut per_line: F) -> Result<(), Error>
    where
        F: FnMut(&str),
    {
        for &byte in data {
            self.write_byte(byte, &mut per_line);
        }
        Ok(())
    }

    fn write_byte<F>(&mut self, byte: u8, per_line: &mut F)
    where
        F: FnMut(&str),
    {
        match byte {
            ASCII_LF => {
                if self.buffer.len() < self.capacity {
                    // Only printable ASCII is ever stored, so this cannot fail.
                    if let Ok(line) = core::str::from_utf8(&self.buffer) {
                        per_line(line);
                    }
                } else {
                    self.dropped_lines += 1;
                }
                self.reset();
            }
            ASCII_SPACE..=ASCII_TILDE => {
                if self.buffer.len() < self.capacity {
                    self.buffer.push(byte);
                }
            }
            _ => {}
        }
    }

    /// Discard any partially assembled line.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes in the partially assembled line.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if no partial line is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of lines discarded because they overflowed the buffer.
    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }
}
