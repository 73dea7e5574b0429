//! Matching engine: the accumulation buffer plus the rules for turning a
//! pattern hit, an end of stream or a deadline into a [`Match`].

use std::time::Duration;

use tokio::time::Instant;

use super::buffer::AccumulationBuffer;
use super::pattern::{Pattern, PatternMatch, PatternSet};
use crate::types::Match;

/// Buffer-side state of a session's expect engine.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    buffer: AccumulationBuffer,
}

impl Matcher {
    /// Create a matcher with an optional search window in bytes.
    #[must_use]
    pub const fn new(search_window: Option<usize>) -> Self {
        Self {
            buffer: AccumulationBuffer::new(search_window),
        }
    }

    /// The accumulation buffer.
    #[must_use]
    pub const fn buffer(&self) -> &AccumulationBuffer {
        &self.buffer
    }

    /// Mutable access to the accumulation buffer.
    pub const fn buffer_mut(&mut self) -> &mut AccumulationBuffer {
        &mut self.buffer
    }

    /// Add freshly decoded text, then trim to the search window.
    ///
    /// The retained tail is never shorter than the longest literal in
    /// `patterns`, so a literal that has just completed at the end of the
    /// buffer survives the trim. Regexes only ever see the window. Returns
    /// the number of bytes trimmed.
    pub fn ingest(&mut self, text: &str, patterns: &PatternSet) -> usize {
        self.buffer.append(text);
        self.buffer.trim(patterns.longest_literal())
    }

    /// Search the buffer without consuming anything.
    #[must_use]
    pub fn try_match(&self, patterns: &PatternSet) -> Option<(usize, PatternMatch)> {
        patterns.find_match(self.buffer.as_str())
    }

    /// Build the result for a pattern hit and consume through its end.
    pub fn consume_match(&mut self, patterns: &PatternSet, index: usize, m: PatternMatch) -> Match {
        let text = self.buffer.as_str();
        let captures = match patterns.get(index).map(|p| &p.pattern) {
            Some(Pattern::Regex(r)) => r.captures_at(text, m.start),
            _ => Vec::new(),
        };
        let matched = m.as_str(text).to_string();
        let after = text[m.end..].to_string();

        let mut consumed = self.buffer.consume(m.end);
        consumed.truncate(m.start);
        Match::new(index, m.start..m.end, matched, consumed, after).with_captures(captures)
    }

    /// Resolve to the EOF sentinel: everything buffered becomes `before`.
    pub fn eof_match(&mut self, index: usize) -> Match {
        let end = self.buffer.len();
        let before = self.buffer.take();
        Match::new(index, end..end, "", before, "")
    }

    /// Resolve to the timeout sentinel. The buffer is left intact so a later
    /// expect still sees the text.
    #[must_use]
    pub fn timeout_match(&self, index: usize) -> Match {
        let end = self.buffer.len();
        Match::new(index, end..end, "", self.buffer.as_str(), "")
    }
}

/// Deadline bookkeeping for one expect call.
///
/// The deadline is fixed when the call starts and is never extended by
/// incoming data.
#[derive(Debug, Clone, Copy)]
pub struct ExpectState {
    started: Instant,
    timeout: Duration,
}

impl ExpectState {
    /// Start the clock.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    /// The total budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time left before the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.started.elapsed())
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.remaining().is_zero()
    }
}
