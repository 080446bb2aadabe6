//! Pattern buffer for classifying incrementally arriving output.
//!
//! Unlike a longest-match or earliest-position scanner, candidates are
//! tried strictly in the order given: the first candidate that matches
//! anywhere in the unconsumed output wins. Callers order narrow patterns
//! (pagination, banners) before broad ones (any prompt) so an interstitial
//! is never mistaken for the end of a command.

use bytes::{Bytes, BytesMut};

use super::patterns::{PromptKind, PromptPattern};

/// A candidate that matched the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Position of the candidate in the list it was raced in.
    pub index: usize,

    /// Tag of the matching pattern.
    pub kind: PromptKind,

    /// Match start, relative to the unconsumed buffer.
    pub start: usize,

    /// Match end, relative to the unconsumed buffer.
    pub end: usize,
}

/// Buffer of output received but not yet consumed by a match.
#[derive(Debug)]
pub struct PatternBuffer {
    buffer: BytesMut,
}

impl PatternBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Append newly received data.
    ///
    /// Data is kept verbatim, escape sequences included; they are stripped
    /// later by the output normalizer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Find the first candidate, in declaration order, that matches.
    ///
    /// This is not leftmost-match semantics: a later candidate that matches
    /// earlier in the buffer still loses to an earlier candidate matching
    /// anywhere. It deliberately departs from the earliest-position rule of
    /// classic expect tools, where list order only breaks ties at the same
    /// position, so a pagination marker that arrives in the same read as
    /// stray prompt-like text is never taken for the end of a command.
    pub fn find_first(&self, candidates: &[&PromptPattern]) -> Option<Hit> {
        candidates.iter().enumerate().find_map(|(index, pattern)| {
            pattern.find(&self.buffer).map(|(start, end)| Hit {
                index,
                kind: pattern.kind(),
                start,
                end,
            })
        })
    }

    /// Consume everything up to the end of `hit`.
    ///
    /// Returns `(before, matched)`. Output after the match stays buffered.
    pub fn consume(&mut self, hit: &Hit) -> (Bytes, Bytes) {
        let before = self.buffer.split_to(hit.start).freeze();
        let matched = self.buffer.split_to(hit.end - hit.start).freeze();
        (before, matched)
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new()
    }
}
