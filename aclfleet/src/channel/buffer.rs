//! Pattern buffer with tail-search prompt detection.
//!
//! Device output is accumulated with terminal escape sequences removed, and
//! prompt patterns are only searched in the last `search_depth` bytes so a
//! long `show` output does not get rescanned on every read.

use bytes::{Bytes, BytesMut};
use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Buffer for accumulating output and searching its tail for prompts.
pub struct PatternBuffer {
    /// The accumulated, escape-free output.
    buffer: BytesMut,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Escape sequence state, kept across reads so a sequence split over
    /// two chunks is still removed.
    parser: Parser,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Extend the buffer with new data, stripping escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        let mut sink = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut sink, data);
    }

    /// Search only the tail of the buffer for the pattern.
    ///
    /// Offsets in the returned match are relative to the start of the
    /// searched tail, not the whole buffer.
    pub fn search_tail(&self, pattern: &Regex) -> Option<regex::bytes::Match<'_>> {
        pattern.find(self.tail())
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        self.search_tail(pattern).is_some()
    }

    /// The last line, without its leading newline. Usually the prompt.
    pub fn last_line(&self) -> &[u8] {
        match memchr::memrchr(b'\n', &self.buffer) {
            Some(pos) => &self.buffer[pos + 1..],
            None => &self.buffer,
        }
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Take the contents split into everything before the last line and
    /// the last line itself, and reset.
    pub fn take_prompted(&mut self) -> (Bytes, Bytes) {
        let split_at = self.buffer.len() - self.last_line().len();
        let mut body = self.buffer.split();
        let prompt = body.split_off(split_at);
        (body.freeze(), prompt.freeze())
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn tail(&self) -> &[u8] {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        &self.buffer[start..]
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Keeps printable text and line structure, drops every escape sequence
/// and other control byte.
struct Printable<'a> {
    out: &'a mut BytesMut,
}

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.extend_from_slice(&[byte]);
        }
    }
}
