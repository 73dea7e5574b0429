//! Error types for ptyscript.
//!
//! Errors raised while waiting on output carry the buffer contents at the
//! time of failure, so a failing script can show what the child actually
//! printed.

use std::time::Duration;

use thiserror::Error;

use crate::encoding::{Codec, DecodeError};

/// Maximum length of buffer content to display in error messages.
const MAX_BUFFER_DISPLAY: usize = 500;

/// Lines of tail kept when a large buffer is truncated.
const CONTEXT_LINES: usize = 6;

/// Format buffer content for display, keeping the tail of large buffers.
fn format_buffer_snippet(buffer: &str) -> String {
    if buffer.is_empty() {
        return "(empty buffer)".to_string();
    }

    let lines: Vec<&str> = buffer.lines().collect();
    if buffer.len() <= MAX_BUFFER_DISPLAY || lines.len() <= CONTEXT_LINES {
        return format!(
            "┌─ buffer ({} bytes) ──────────────────────\n│ {}\n└────────────────────────────────────────",
            buffer.len(),
            lines.join("\n│ ")
        );
    }

    let tail = &lines[lines.len() - CONTEXT_LINES..];
    format!(
        "┌─ buffer ({} bytes, {} lines) ─────────────\n│ ... ({} lines hidden)\n│ {}\n└────────────────────────────────────────",
        buffer.len(),
        lines.len(),
        lines.len() - tail.len(),
        tail.join("\n│ ")
    )
}

fn format_timeout_error(duration: Duration, pattern: &str, buffer: &str) -> String {
    format!(
        "timeout after {duration:?} waiting for {pattern}\n\n{}",
        format_buffer_snippet(buffer)
    )
}

fn format_eof_error(pattern: &str, buffer: &str) -> String {
    format!(
        "end of stream reached while waiting for {pattern}\n\n{}",
        format_buffer_snippet(buffer)
    )
}

fn format_decode_error(source: &DecodeError, buffer: &str) -> String {
    format!(
        "failed to decode child output: {source}\n\n{}",
        format_buffer_snippet(buffer)
    )
}

/// The main error type for ptyscript operations.
#[derive(Debug, Error)]
pub enum ExpectError {
    /// Failed to spawn the child.
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] SpawnError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The deadline elapsed before any pattern matched and no timeout
    /// sentinel was registered.
    #[error("{}", format_timeout_error(*duration, pattern, buffer))]
    Timeout {
        /// The timeout that elapsed.
        duration: Duration,
        /// Description of the patterns being awaited.
        pattern: String,
        /// Buffer contents at the time of timeout.
        buffer: String,
    },

    /// The stream ended before any pattern matched and no EOF sentinel was
    /// registered.
    #[error("{}", format_eof_error(pattern, buffer))]
    Eof {
        /// Description of the patterns being awaited.
        pattern: String,
        /// Buffer contents when the stream ended.
        buffer: String,
    },

    /// Child output could not be decoded by the session codec.
    ///
    /// Any text decoded before the invalid sequence was already appended to
    /// the buffer and is included in `buffer`.
    #[error("{}", format_decode_error(source, buffer))]
    Decode {
        /// What was wrong with the bytes.
        #[source]
        source: DecodeError,
        /// Buffer contents after appending the valid prefix.
        buffer: String,
    },

    /// Text to send, or a pattern to expect, is not representable in the
    /// session codec. Nothing was written.
    #[error("cannot encode {character:?} at char {position} of {text:?} as {codec}")]
    Encoding {
        /// The session codec.
        codec: Codec,
        /// The offending text.
        text: String,
        /// The first character that could not be encoded.
        character: char,
        /// Char index of that character in `text`.
        position: usize,
    },

    /// The transport cannot change terminal echo.
    #[error("echo control unsupported: {reason}")]
    EchoUnsupported {
        /// Why the change was refused.
        reason: String,
    },

    /// The pattern set cannot be matched.
    #[error("invalid pattern: {message}")]
    InvalidPattern {
        /// Description of what's wrong with the pattern.
        message: String,
    },

    /// Invalid regex pattern.
    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// The session was closed, or failed on an earlier I/O error.
    #[error("session is closed")]
    SessionClosed,

    /// A logging sink rejected a write.
    #[error("{direction} log sink failed: {source}")]
    LogSink {
        /// `"send"` or `"read"`.
        direction: &'static str,
        /// The sink's error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Errors related to process spawning.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The command string was empty.
    #[error("no command given")]
    EmptyCommand,

    /// Command or argument contained an interior NUL.
    #[error("invalid {kind} {value:?}: contains a NUL byte")]
    NulByte {
        /// `"command"` or `"argument"`.
        kind: &'static str,
        /// The offending value.
        value: String,
    },

    /// The pty layer failed.
    #[error(transparent)]
    Pty(#[from] ptyscript_pty::PtyError),
}

/// Result type alias for ptyscript operations.
pub type Result<T> = std::result::Result<T, ExpectError>;

impl ExpectError {
    /// Create a timeout error.
    pub fn timeout(
        duration: Duration,
        pattern: impl Into<String>,
        buffer: impl Into<String>,
    ) -> Self {
        Self::Timeout {
            duration,
            pattern: pattern.into(),
            buffer: buffer.into(),
        }
    }

    /// Create an end-of-stream error.
    pub fn eof(pattern: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self::Eof {
            pattern: pattern.into(),
            buffer: buffer.into(),
        }
    }

    /// Create an invalid pattern error.
    pub fn invalid_pattern(message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            message: message.into(),
        }
    }

    /// Create an echo-unsupported error.
    pub fn echo_unsupported(reason: impl Into<String>) -> Self {
        Self::EchoUnsupported {
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Wrap an I/O result with context.
    pub fn with_io_context<T>(result: std::io::Result<T>, context: impl Into<String>) -> Result<T> {
        result.map_err(|e| Self::io_context(context, e))
    }

    /// Check if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this is an end-of-stream error.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof { .. })
    }

    /// Get the buffer contents if this error carries them.
    #[must_use]
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::Timeout { buffer, .. } | Self::Eof { buffer, .. } | Self::Decode { buffer, .. } => {
                Some(buffer)
            }
            _ => None,
        }
    }
}
