//! TOML configuration files.
//!
//! ```toml
//! timeout_ms = 5000
//! search_window = 2000
//! codec = "utf-8"
//! line_ending = "crlf"
//! echo = false
//! working_dir = "/tmp"
//!
//! [terminal]
//! cols = 120
//! rows = 40
//!
//! [env]
//! TERM = "dumb"
//! ```
//!
//! Every key is optional. Unknown keys are rejected.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::{LineEnding, SessionConfig};
use crate::encoding::Codec;
use crate::error::{ExpectError, Result};

/// The parsed contents of a configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Default expect timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Grace period for `close`, in milliseconds.
    pub close_timeout_ms: Option<u64>,
    /// Search window in bytes; `0` disables trimming.
    pub search_window: Option<usize>,
    /// Bytes per transport read.
    pub read_size: Option<usize>,
    /// Codec name.
    pub codec: Option<Codec>,
    /// Line ending name.
    pub line_ending: Option<LineEnding>,
    /// Initial echo state.
    pub echo: Option<bool>,
    /// Child working directory.
    pub working_dir: Option<PathBuf>,
    /// Whether the child inherits the parent environment.
    pub inherit_env: Option<bool>,
    /// Terminal size.
    pub terminal: Option<TerminalSection>,
    /// Extra child environment.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// `[terminal]` table.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminalSection {
    /// Columns.
    pub cols: Option<u16>,
    /// Rows.
    pub rows: Option<u16>,
}

impl ConfigFile {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ExpectError::config(format!("invalid config: {e}")))
    }

    /// Read and parse a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ExpectError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| ExpectError::config(format!("{}: {e}", path.display())))
    }

    /// Overlay the values present in the file onto `config`.
    #[must_use]
    pub fn apply(self, mut config: SessionConfig) -> SessionConfig {
        if let Some(ms) = self.timeout_ms {
            config.timeout.default = Duration::from_millis(ms);
        }
        if let Some(ms) = self.close_timeout_ms {
            config.timeout.close = Duration::from_millis(ms);
        }
        if let Some(window) = self.search_window {
            config.buffer.search_window = (window > 0).then_some(window);
        }
        if let Some(size) = self.read_size {
            config.buffer.read_size = size;
        }
        if let Some(codec) = self.codec {
            config.codec = codec;
        }
        if let Some(ending) = self.line_ending {
            config.line_ending = ending;
        }
        if let Some(echo) = self.echo {
            config.echo = echo;
        }
        if let Some(dir) = self.working_dir {
            config.working_dir = Some(dir);
        }
        if let Some(inherit) = self.inherit_env {
            config.inherit_env = inherit;
        }
        if let Some(terminal) = self.terminal {
            if let Some(cols) = terminal.cols {
                config.dimensions.0 = cols;
            }
            if let Some(rows) = terminal.rows {
                config.dimensions.1 = rows;
            }
        }
        config.env.extend(self.env);
        config
    }
}

impl SessionConfig {
    /// Defaults overlaid with a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = ConfigFile::load(path)?.apply(Self::default());
        config.validate()?;
        Ok(config)
    }
}
