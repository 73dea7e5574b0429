//! Common types: match results, session state and control characters.

use std::fmt;
use std::ops::Range;

/// The outcome of a successful expect call.
///
/// Offsets in [`span`](Self::span) refer to the accumulation buffer as it
/// was just before the match consumed it. For sentinel matches the span is
/// empty and `matched` is the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Zero-based index of the winning pattern in the caller's sequence.
    pub pattern_index: usize,

    /// Byte span of the match in the buffer.
    pub span: Range<usize>,

    /// The text that matched.
    pub matched: String,

    /// Regex capture groups, in group order. Unmatched groups are `None`.
    pub captures: Vec<Option<String>>,

    /// Buffer text preceding the match.
    pub before: String,

    /// Buffer text following the match, still unconsumed.
    pub after: String,
}

impl Match {
    /// Create a match result without captures.
    #[must_use]
    pub fn new(
        pattern_index: usize,
        span: Range<usize>,
        matched: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            pattern_index,
            span,
            matched: matched.into(),
            captures: Vec::new(),
            before: before.into(),
            after: after.into(),
        }
    }

    /// Attach regex capture groups.
    #[must_use]
    pub fn with_captures(mut self, captures: Vec<Option<String>>) -> Self {
        self.captures = captures;
        self
    }

    /// Get a capture group by index (group 0 is the whole match).
    #[must_use]
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).and_then(Option::as_deref)
    }

    /// The matched text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.matched
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.matched)
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Reading and writing are possible.
    Running,

    /// The transport reported end of stream. Buffered text can still be
    /// matched and writes are still attempted.
    EndOfStream,

    /// The session was closed by the caller.
    Closed,

    /// A transport I/O error occurred; every later operation fails.
    Failed,
}

impl SessionState {
    /// Whether reads from the transport can still produce data.
    #[must_use]
    pub const fn is_readable(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether the session refuses all further I/O.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::EndOfStream => "end of stream",
            Self::Closed => "closed",
            Self::Failed => "failed",
        })
    }
}

/// Control characters that can be sent to a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlChar {
    /// Ctrl+C (ETX), interrupt.
    CtrlC,
    /// Ctrl+D (EOT), end of file in canonical mode.
    CtrlD,
    /// Ctrl+G (BEL).
    CtrlG,
    /// Ctrl+H (BS).
    CtrlH,
    /// Ctrl+L (FF).
    CtrlL,
    /// Ctrl+Q (DC1), resume output.
    CtrlQ,
    /// Ctrl+S (DC3), pause output.
    CtrlS,
    /// Ctrl+U (NAK), kill line.
    CtrlU,
    /// Ctrl+W (ETB), kill word.
    CtrlW,
    /// Ctrl+Z (SUB), suspend.
    CtrlZ,
    /// Escape.
    Escape,
    /// Ctrl+\ (FS), quit.
    CtrlBackslash,
    /// Any other control byte, produced by [`ControlChar::from_char`].
    Other(u8),
}

impl ControlChar {
    /// The byte value sent to the terminal.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::CtrlC => 0x03,
            Self::CtrlD => 0x04,
            Self::CtrlG => 0x07,
            Self::CtrlH => 0x08,
            Self::CtrlL => 0x0C,
            Self::CtrlQ => 0x11,
            Self::CtrlS => 0x13,
            Self::CtrlU => 0x15,
            Self::CtrlW => 0x17,
            Self::CtrlZ => 0x1A,
            Self::Escape => 0x1B,
            Self::CtrlBackslash => 0x1C,
            Self::Other(b) => b,
        }
    }

    /// Map a key name to its control byte, as in `^c`.
    ///
    /// Letters are case-insensitive. `@ [ \ ] ^ _ ?` map to 0x00, 0x1B to
    /// 0x1F and 0x7F respectively.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        let byte = match c {
            'a'..='z' => c as u8 - b'a' + 1,
            'A'..='Z' => c as u8 - b'A' + 1,
            '@' => 0x00,
            '[' => 0x1B,
            '\\' => 0x1C,
            ']' => 0x1D,
            '^' => 0x1E,
            '_' => 0x1F,
            '?' => 0x7F,
            _ => return None,
        };
        Some(Self::from_byte(byte))
    }

    const fn from_byte(byte: u8) -> Self {
        match byte {
            0x03 => Self::CtrlC,
            0x04 => Self::CtrlD,
            0x07 => Self::CtrlG,
            0x08 => Self::CtrlH,
            0x0C => Self::CtrlL,
            0x11 => Self::CtrlQ,
            0x13 => Self::CtrlS,
            0x15 => Self::CtrlU,
            0x17 => Self::CtrlW,
            0x1A => Self::CtrlZ,
            0x1B => Self::Escape,
            0x1C => Self::CtrlBackslash,
            other => Self::Other(other),
        }
    }
}
