//! Logging taps: optional sinks that receive a copy of everything sent to
//! the child and everything decoded from it.
//!
//! Taps run synchronously, before the text reaches the transport (send) or
//! the accumulation buffer (read). They see exactly what the matcher sees;
//! echoed input arrives on the read side like any other output.
//!
//! Sinks always receive UTF-8 text. Diagnostics about the session itself go
//! through `tracing`, never through the taps.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{ExpectError, Result};

/// A destination for logged session text.
///
/// Implemented for every `Write + Send` type, so files, `Vec<u8>`,
/// `std::io::Stdout` and [`SharedLog`] all work as sinks.
pub trait LogSink: Send {
    /// Record one piece of text.
    fn log(&mut self, text: &str) -> io::Result<()>;
}

impl<W: Write + Send> LogSink for W {
    fn log(&mut self, text: &str) -> io::Result<()> {
        self.write_all(text.as_bytes())?;
        self.flush()
    }
}

/// Which side of the conversation a tap records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Text written to the child.
    Send,
    /// Text decoded from the child.
    Read,
}

impl Direction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Read => "read",
        }
    }
}

/// The pair of taps owned by a session.
#[derive(Default)]
pub struct LogTaps {
    send: Option<Box<dyn LogSink>>,
    read: Option<Box<dyn LogSink>>,
}

impl LogTaps {
    /// Install or remove the tap for one direction.
    pub fn set(&mut self, direction: Direction, sink: Option<Box<dyn LogSink>>) {
        match direction {
            Direction::Send => self.send = sink,
            Direction::Read => self.read = sink,
        }
    }

    /// Whether a tap is installed for `direction`.
    #[must_use]
    pub const fn is_set(&self, direction: Direction) -> bool {
        match direction {
            Direction::Send => self.send.is_some(),
            Direction::Read => self.read.is_some(),
        }
    }

    /// Pass `text` to the tap for `direction`, if any.
    pub fn record(&mut self, direction: Direction, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let sink = match direction {
            Direction::Send => self.send.as_mut(),
            Direction::Read => self.read.as_mut(),
        };
        match sink {
            Some(sink) => sink.log(text).map_err(|source| ExpectError::LogSink {
                direction: direction.as_str(),
                source,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for LogTaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogTaps")
            .field("send", &self.send.is_some())
            .field("read", &self.read.is_some())
            .finish()
    }
}

/// An in-memory sink that can be cloned and read back while the session
/// still holds it.
#[derive(Debug, Clone, Default)]
pub struct SharedLog {
    data: Arc<Mutex<Vec<u8>>>,
}

impl SharedLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything logged so far.
    #[must_use]
    pub fn contents(&self) -> String {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&data).into_owned()
    }

    /// Discard everything logged so far.
    pub fn clear(&self) {
        self.data.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Write for SharedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data
            .lock()
            .map_err(|_| io::Error::other("shared log poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
