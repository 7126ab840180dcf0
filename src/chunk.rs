//! Whitespace-boundary chunker for oversized text payloads.
//!
//! Splits an encoded text buffer into windows of at most `ceiling` bytes.
//! Each window ends on a whitespace byte found by scanning back at most
//! [`LOOKBACK`] bytes from the raw ceiling offset; when no whitespace is
//! found the raw offset is kept (moved back to a UTF-8 character boundary),
//! accepting a mid-word cut. The next window begins where the previous one
//! ended, so every byte belongs to exactly one window.
//!
//! Chunks are produced lazily: the caller submits chunk *n* before the
//! offsets of chunk *n + 1* are computed.

/// Maximum distance scanned back from a raw offset in search of whitespace.
pub const LOOKBACK: usize = 100;

/// One emitted window of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based ordinal among emitted chunks.
    pub index: usize,
    pub start: usize,
    pub end: usize,
    /// Decoded and trimmed text of `[start, end)`.
    pub text: String,
}

/// Lazy iterator over the chunks of a buffer.
#[derive(Debug, Clone)]
pub struct ChunkSplitter<'a> {
    buffer: &'a [u8],
    ceiling: usize,
    start: usize,
    emitted: usize,
}

impl<'a> ChunkSplitter<'a> {
    /// `ceiling` is clamped to at least one byte.
    pub fn new(buffer: &'a [u8], ceiling: usize) -> Self {
        Self {
            buffer,
            ceiling: ceiling.max(1),
            start: 0,
            emitted: 0,
        }
    }

    /// End offset of the window beginning at `start`.
    fn window_end(&self, start: usize) -> usize {
        let len = self.buffer.len();
        let raw = start.saturating_add(self.ceiling).min(len);
        if raw >= len || is_space(self.buffer[raw]) {
            return raw;
        }

        let floor = raw.saturating_sub(LOOKBACK).max(start + 1);
        if let Some(boundary) = (floor..raw).rev().find(|&i| is_space(self.buffer[i])) {
            return boundary;
        }

        char_boundary_before(self.buffer, raw, start)
    }
}

impl Iterator for ChunkSplitter<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        while self.start < self.buffer.len() {
            let start = self.start;
            let end = self.window_end(start);
            self.start = end;

            let text = String::from_utf8_lossy(&self.buffer[start..end]);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }

            self.emitted += 1;
            return Some(Chunk {
                index: self.emitted,
                start,
                end,
                text: trimmed.to_string(),
            });
        }
        None
    }
}

/// Convenience wrapper returning the full chunk plan.
pub fn split(buffer: &[u8], ceiling: usize) -> Vec<Chunk> {
    ChunkSplitter::new(buffer, ceiling).collect()
}

fn is_space(byte: u8) -> bool {
    byte.is_ascii_whitespace()
}

/// Largest offset `<= raw` and `> start` that does not split a UTF-8
/// sequence. Falls forward past `raw` when a single character is wider than
/// the window.
fn char_boundary_before(buffer: &[u8], raw: usize, start: usize) -> usize {
    let is_continuation = |i: usize| i < buffer.len() && (buffer[i] & 0xC0) == 0x80;

    let mut end = raw;
    while end > start + 1 && is_continuation(end) {
        end -= 1;
    }
    if is_continuation(end) {
        end = raw;
        while is_continuation(end) {
            end += 1;
        }
    }
    end
}
