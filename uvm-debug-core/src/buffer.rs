//! The bridge's single line buffer and the bounded line reader that feeds it.
//!
//! A buffer of capacity `N` holds at most `N - 1` bytes; the last byte is
//! reserved for the terminator the DPI layer appends when it hands the
//! content to C callers.

use crate::error::{BridgeError, BridgeResult};
use std::io::{BufRead, Read};

/// Historical size of the shim's input buffer.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Smallest usable capacity: one content byte plus the terminator.
pub const MIN_CAPACITY: usize = 2;

#[derive(Debug, Clone)]
pub struct LineBuffer {
    content: String,
    capacity: usize,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            content: String::new(),
            capacity: capacity.max(MIN_CAPACITY),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest line (in bytes) the buffer accepts.
    pub fn max_line_len(&self) -> usize {
        self.capacity - 1
    }

    pub fn fits(&self, len: usize) -> bool {
        len <= self.max_line_len()
    }

    /// Replace the content. Oversized text is rejected and the previous
    /// content is kept.
    pub fn store(&mut self, text: String) -> BridgeResult<()> {
        if !self.fits(text.len()) {
            return Err(BridgeError::InputOverflow {
                capacity: self.capacity,
                len: text.len(),
            });
        }
        self.content = text;
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Read one line of at most `capacity - 1` bytes from `reader`.
///
/// Never buffers more than `capacity` bytes. An oversized line is consumed
/// up to and including its newline and reported as `InputOverflow`, so the
/// next call starts on the following line. A trailing `\n` or `\r\n` is
/// stripped. Returns `EndOfInput` when nothing is left to read.
pub fn read_bounded_line<R>(reader: &mut R, capacity: usize) -> BridgeResult<String>
where
    R: BufRead + ?Sized,
{
    let capacity = capacity.max(MIN_CAPACITY);
    let mut line = Vec::with_capacity(capacity.min(256));

    let read = {
        let mut limited = Read::take(&mut *reader, capacity as u64);
        limited.read_until(b'\n', &mut line)?
    };

    if read == 0 {
        return Err(BridgeError::EndOfInput);
    }

    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        return Ok(decode(line));
    }

    if read < capacity {
        // Final line without a newline.
        return Ok(decode(line));
    }

    // Exactly `capacity - 1` content bytes followed by CRLF lands the '\r'
    // inside the window and the '\n' just outside it.
    if line.last() == Some(&b'\r') && reader.fill_buf()?.first() == Some(&b'\n') {
        reader.consume(1);
        line.pop();
        return Ok(decode(line));
    }

    let discarded = discard_rest_of_line(reader)?;
    let len = read + discarded;
    tracing::warn!(len, capacity, "input line exceeds buffer capacity; discarded");
    Err(BridgeError::InputOverflow { capacity, len })
}

/// Consume bytes through the next newline, returning how many content bytes
/// were dropped.
fn discard_rest_of_line<R>(reader: &mut R) -> BridgeResult<usize>
where
    R: BufRead + ?Sized,
{
    let mut dropped = 0;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(dropped);
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                let mut content = pos;
                if pos > 0 && available[pos - 1] == b'\r' {
                    content -= 1;
                }
                reader.consume(pos + 1);
                return Ok(dropped + content);
            }
            None => {
                let n = available.len();
                reader.consume(n);
                dropped += n;
            }
        }
    }
}

/// Drop one trailing `\n` or `\r\n`.
pub fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("input line is not valid UTF-8; replacing invalid bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}
