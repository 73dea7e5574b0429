//! Scripted events replayed by a [`MockTransport`](super::MockTransport).

use std::io;
use std::time::Duration;

/// One step of what the mock child "does" on the read side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// Bytes delivered by a single read (split only if the reader's buffer
    /// is smaller).
    Output(Vec<u8>),
    /// Nothing readable until the delay has elapsed.
    Delay(Duration),
    /// End of stream. Every later read returns zero bytes.
    Eof,
    /// The next read fails.
    Error(io::ErrorKind, String),
}

impl MockEvent {
    /// Output event from bytes.
    pub fn output(data: impl Into<Vec<u8>>) -> Self {
        Self::Output(data.into())
    }

    /// Output event from a string.
    #[must_use]
    pub fn output_str(s: &str) -> Self {
        Self::Output(s.as_bytes().to_vec())
    }

    /// Delay event.
    #[must_use]
    pub const fn delay(duration: Duration) -> Self {
        Self::Delay(duration)
    }

    /// Delay event in milliseconds.
    #[must_use]
    pub const fn delay_ms(ms: u64) -> Self {
        Self::Delay(Duration::from_millis(ms))
    }

    /// End-of-stream event.
    #[must_use]
    pub const fn eof() -> Self {
        Self::Eof
    }

    /// Read error event.
    pub fn error(kind: io::ErrorKind, msg: impl Into<String>) -> Self {
        Self::Error(kind, msg.into())
    }

    /// Whether this is an output event.
    #[must_use]
    pub const fn is_output(&self) -> bool {
        matches!(self, Self::Output(_))
    }

    /// Whether this is the end-of-stream event.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}
