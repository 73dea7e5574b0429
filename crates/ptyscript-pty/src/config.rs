//! Launch parameters for a pty child, the signals it may receive, and the
//! terminal dimensions.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// How the child is launched on the slave side.
///
/// ```
/// use ptyscript_pty::PtyConfig;
///
/// let config = PtyConfig::builder()
///     .working_directory("/tmp")
///     .env("TERM", "dumb")
///     .window_size(100, 30)
///     .echo(false)
///     .build();
/// assert!(!config.echo);
/// ```
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Working directory; `None` keeps the parent's.
    pub working_directory: Option<PathBuf>,
    /// Start from the parent's environment.
    pub inherit_env: bool,
    /// Variables set on top of the base environment.
    pub env: HashMap<OsString, OsString>,
    /// Initial window size.
    pub window_size: WindowSize,
    /// Initial `ECHO` local mode, applied before the child starts.
    pub echo: bool,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            working_directory: None,
            inherit_env: true,
            env: HashMap::new(),
            window_size: WindowSize::default(),
            echo: true,
        }
    }
}

impl PtyConfig {
    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> PtyConfigBuilder {
        PtyConfigBuilder::default()
    }

    /// The complete environment the child starts with.
    #[must_use]
    pub fn effective_env(&self) -> HashMap<OsString, OsString> {
        let mut env: HashMap<_, _> = if self.inherit_env {
            std::env::vars_os().collect()
        } else {
            HashMap::new()
        };
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

/// Builder for [`PtyConfig`].
#[derive(Debug, Clone, Default)]
pub struct PtyConfigBuilder {
    config: PtyConfig,
}

impl PtyConfigBuilder {
    /// Run the child in `path`.
    #[must_use]
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.working_directory = Some(path.into());
        self
    }

    /// Do not inherit the parent's environment.
    #[must_use]
    pub const fn env_clear(mut self) -> Self {
        self.config.inherit_env = false;
        self
    }

    /// Set one variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.config.env.insert(key.into(), value.into());
        self
    }

    /// Initial window size.
    #[must_use]
    pub const fn window_size(mut self, cols: u16, rows: u16) -> Self {
        self.config.window_size = WindowSize::new(cols, rows);
        self
    }

    /// Initial echo mode.
    #[must_use]
    pub const fn echo(mut self, enabled: bool) -> Self {
        self.config.echo = enabled;
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> PtyConfig {
        self.config
    }
}

/// Signals a session may deliver to its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PtySignal {
    /// SIGINT.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGKILL.
    Kill,
    /// SIGHUP, also what the kernel sends when the master closes.
    Hangup,
}

impl PtySignal {
    /// The platform signal number.
    #[cfg(unix)]
    #[must_use]
    pub const fn as_unix_signal(self) -> i32 {
        match self {
            Self::Interrupt => libc::SIGINT,
            Self::Terminate => libc::SIGTERM,
            Self::Kill => libc::SIGKILL,
            Self::Hangup => libc::SIGHUP,
        }
    }
}

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    /// Columns.
    pub cols: u16,
    /// Rows.
    pub rows: u16,
}

impl WindowSize {
    /// A `cols` x `rows` window.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl From<(u16, u16)> for WindowSize {
    fn from((cols, rows): (u16, u16)) -> Self {
        Self::new(cols, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let config = PtyConfig::builder()
            .working_directory("/tmp")
            .env("FOO", "bar")
            .window_size(120, 40)
            .echo(false)
            .build();

        assert_eq!(config.working_directory, Some(PathBuf::from("/tmp")));
        assert_eq!(config.window_size, WindowSize::new(120, 40));
        assert_eq!(config.env.get(&OsString::from("FOO")), Some(&OsString::from("bar")));
        assert!(!config.echo);
    }

    #[test]
    fn defaults_inherit_and_echo() {
        let config = PtyConfig::default();
        assert!(config.echo);
        assert!(config.inherit_env);
        assert_eq!(config.window_size, WindowSize::new(80, 24));
    }

    #[test]
    fn cleared_env_holds_only_explicit_vars() {
        let config = PtyConfig::builder().env_clear().env("KEEP", "1").build();

        let env = config.effective_env();
        assert_eq!(env.len(), 1);
        assert_eq!(env.get(&OsString::from("KEEP")), Some(&OsString::from("1")));
    }

    #[cfg(unix)]
    #[test]
    fn signal_numbers() {
        assert_eq!(PtySignal::Kill.as_unix_signal(), libc::SIGKILL);
        assert_eq!(PtySignal::Hangup.as_unix_signal(), libc::SIGHUP);
    }
}
