//! Configuration types for ptyscript sessions.
//!
//! A [`SessionConfig`] can be built in code, loaded from TOML
//! ([`file`]) or overridden from `PTYSCRIPT_*` environment variables
//! ([`env`]).

pub mod env;
pub mod file;

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::encoding::Codec;
use crate::error::{ExpectError, Result};

/// Default timeout for expect operations (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default grace period between hanging up a child and killing it.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_millis(100);

/// Default size of a single transport read.
pub const DEFAULT_READ_SIZE: usize = 4096;

/// Default terminal width.
pub const DEFAULT_TERMINAL_WIDTH: u16 = 80;

/// Default terminal height.
pub const DEFAULT_TERMINAL_HEIGHT: u16 = 24;

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Environment variables to set in the child.
    pub env: HashMap<String, String>,

    /// Whether the child inherits the parent environment.
    pub inherit_env: bool,

    /// Working directory for the child.
    pub working_dir: Option<PathBuf>,

    /// Terminal dimensions (columns, rows).
    pub dimensions: (u16, u16),

    /// Timeout configuration.
    pub timeout: TimeoutConfig,

    /// Buffer configuration.
    pub buffer: BufferConfig,

    /// Text codec for output decoding and input encoding.
    pub codec: Codec,

    /// Terminator appended by `send_line`.
    pub line_ending: LineEnding,

    /// Initial terminal echo state for spawned children.
    pub echo: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            env: HashMap::new(),
            inherit_env: true,
            working_dir: None,
            dimensions: (DEFAULT_TERMINAL_WIDTH, DEFAULT_TERMINAL_HEIGHT),
            timeout: TimeoutConfig::default(),
            buffer: BufferConfig::default(),
            codec: Codec::default(),
            line_ending: LineEnding::default(),
            echo: true,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `PTYSCRIPT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        env::EnvConfig::default().apply(Self::default())
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set whether to inherit the parent environment.
    #[must_use]
    pub const fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// Set the terminal dimensions.
    #[must_use]
    pub const fn dimensions(mut self, cols: u16, rows: u16) -> Self {
        self.dimensions = (cols, rows);
        self
    }

    /// Set the default expect timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout.default = timeout;
        self
    }

    /// Set the search window in bytes. `None` keeps the whole buffer.
    #[must_use]
    pub const fn search_window(mut self, window: Option<usize>) -> Self {
        self.buffer.search_window = window;
        self
    }

    /// Set the codec.
    #[must_use]
    pub const fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the line ending style.
    #[must_use]
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set the initial echo state.
    #[must_use]
    pub const fn echo(mut self, enabled: bool) -> Self {
        self.echo = enabled;
        self
    }

    /// Reject settings no session can run with.
    pub fn validate(&self) -> Result<()> {
        if self.buffer.search_window == Some(0) {
            return Err(ExpectError::config("search_window must be greater than zero"));
        }
        if self.buffer.read_size == 0 {
            return Err(ExpectError::config("read_size must be greater than zero"));
        }
        if self.dimensions.0 == 0 || self.dimensions.1 == 0 {
            return Err(ExpectError::config(format!(
                "invalid terminal dimensions {}x{}",
                self.dimensions.0, self.dimensions.1
            )));
        }
        Ok(())
    }
}

/// Timeouts.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Default timeout for expect operations.
    pub default: Duration,

    /// How long `close` waits for the child after hanging up before it
    /// sends SIGKILL.
    pub close: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_TIMEOUT,
            close: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

/// Accumulation buffer settings.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Upper bound on retained unconsumed text, in bytes.
    pub search_window: Option<usize>,

    /// Maximum bytes requested from the transport per read.
    pub read_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            search_window: None,
            read_size: DEFAULT_READ_SIZE,
        }
    }
}

/// Line terminator appended by `send_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum LineEnding {
    /// `\n`. A terminal in canonical mode passes it through unchanged.
    #[default]
    Lf,
    /// `\r\n`.
    CrLf,
    /// `\r`, what a keyboard's Enter key sends.
    Cr,
}

impl LineEnding {
    /// The terminator text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }
}

impl FromStr for LineEnding {
    type Err = ExpectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lf" | "\n" => Ok(Self::Lf),
            "crlf" | "\r\n" => Ok(Self::CrLf),
            "cr" | "\r" => Ok(Self::Cr),
            other => Err(ExpectError::config(format!("unknown line ending: {other:?}"))),
        }
    }
}

impl TryFrom<String> for LineEnding {
    type Error = ExpectError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}
