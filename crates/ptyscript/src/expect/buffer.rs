//! Accumulation buffer for decoded output.
//!
//! Holds decoded text that no match has consumed yet. Text only leaves the
//! buffer from the front: either consumed by a match, or trimmed away when
//! it falls outside the search window.

use std::fmt;

/// Decoded, not-yet-consumed output of a session.
///
/// With a search window set, [`trim`](Self::trim) drops the oldest text so
/// that at most `window` bytes remain (never cutting inside a character).
/// The caller passes a floor, the byte length a partial literal may need,
/// which the trim never goes below.
#[derive(Clone, Default)]
pub struct AccumulationBuffer {
    text: String,
    search_window: Option<usize>,
    discarded: usize,
}

impl AccumulationBuffer {
    /// Create an empty buffer with an optional search window in bytes.
    #[must_use]
    pub const fn new(search_window: Option<usize>) -> Self {
        Self {
            text: String::new(),
            search_window,
            discarded: 0,
        }
    }

    /// The configured search window.
    #[must_use]
    pub const fn search_window(&self) -> Option<usize> {
        self.search_window
    }

    /// Append decoded text.
    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Drop text from the front so at most `max(window, floor)` bytes remain.
    ///
    /// Returns the number of bytes dropped.
    pub fn trim(&mut self, floor: usize) -> usize {
        let Some(window) = self.search_window else {
            return 0;
        };
        let keep = window.max(floor);
        if self.text.len() <= keep {
            return 0;
        }

        let mut cut = self.text.len() - keep;
        if !self.text.is_char_boundary(cut) {
            let up = (cut..self.text.len())
                .find(|&i| self.text.is_char_boundary(i))
                .unwrap_or(self.text.len());
            if self.text.len() - up >= floor {
                cut = up;
            } else {
                while !self.text.is_char_boundary(cut) {
                    cut -= 1;
                }
            }
        }

        self.text.drain(..cut);
        self.discarded += cut;
        tracing::trace!(dropped = cut, kept = self.text.len(), "trimmed buffer to search window");
        cut
    }

    /// Remove everything up to byte offset `end`, returning it.
    ///
    /// `end` must lie on a character boundary and within the buffer.
    pub fn consume(&mut self, end: usize) -> String {
        self.text.drain(..end).collect()
    }

    /// Remove and return the whole buffer.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    /// Current contents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Total bytes dropped by trimming since creation.
    #[must_use]
    pub const fn discarded(&self) -> usize {
        self.discarded
    }

    /// Empty the buffer.
    pub fn clear(&mut self) {
        self.text.clear();
    }
}

impl fmt::Debug for AccumulationBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccumulationBuffer")
            .field("len", &self.text.len())
            .field("search_window", &self.search_window)
            .field("discarded", &self.discarded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_buffer_never_trims() {
        let mut buf = AccumulationBuffer::new(None);
        buf.append(&"x".repeat(10_000));
        assert_eq!(buf.trim(0), 0);
        assert_eq!(buf.len(), 10_000);
    }

    #[test]
    fn trim_keeps_tail_of_window() {
        let mut buf = AccumulationBuffer::new(Some(4));
        buf.append("abcdefgh");
        assert_eq!(buf.trim(0), 4);
        assert_eq!(buf.as_str(), "efgh");
        assert_eq!(buf.discarded(), 4);
    }

    #[test]
    fn trim_respects_literal_floor() {
        let mut buf = AccumulationBuffer::new(Some(2));
        buf.append("abcdefgh");
        buf.trim(5);
        assert_eq!(buf.as_str(), "defgh");
    }

    #[test]
    fn trim_lands_on_char_boundary() {
        let mut buf = AccumulationBuffer::new(Some(3));
        // 'å' is two bytes; a 3-byte tail would start inside it
        buf.append("xxåab");
        buf.trim(0);
        assert_eq!(buf.as_str(), "ab");

        let mut buf = AccumulationBuffer::new(Some(1));
        buf.append("xxåab");
        buf.trim(3);
        assert_eq!(buf.as_str(), "åab");
    }

    #[test]
    fn consume_is_destructive() {
        let mut buf = AccumulationBuffer::new(None);
        buf.append("login: password:");
        assert_eq!(buf.consume(7), "login: ");
        assert_eq!(buf.as_str(), "password:");
        assert_eq!(buf.take(), "password:");
        assert!(buf.is_empty());
    }
}
