//! Builder for spawning sessions with custom configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{LineEnding, SessionConfig};
use crate::encoding::Codec;
use crate::error::{Result, SpawnError};

#[cfg(unix)]
use super::Session;
#[cfg(unix)]
use crate::backend::PtyTransport;

/// Builder for a pty session.
///
/// ```no_run
/// use std::time::Duration;
/// use ptyscript::{Codec, SessionBuilder};
///
/// # async fn demo() -> ptyscript::Result<()> {
/// let mut session = SessionBuilder::new()
///     .command("/bin/cat")
///     .timeout(Duration::from_secs(5))
///     .codec(Codec::Utf8)
///     .echo(false)
///     .spawn()
///     .await?;
/// session.send_line("ping").await?;
/// session.expect("ping").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    command: Option<String>,
    args: Vec<String>,
    config: SessionConfig,
}

impl SessionBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    #[must_use]
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the program to run.
    #[must_use]
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Replace the argument list.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config = self.config.env(key, value);
        self
    }

    /// Start the child with only the variables set through [`env`](Self::env).
    #[must_use]
    pub fn env_clear(mut self) -> Self {
        self.config.inherit_env = false;
        self
    }

    /// Set the child's working directory.
    #[must_use]
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = self.config.working_dir(path);
        self
    }

    /// Set the terminal size.
    #[must_use]
    pub const fn dimensions(mut self, cols: u16, rows: u16) -> Self {
        self.config.dimensions = (cols, rows);
        self
    }

    /// Set the default expect timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout.default = timeout;
        self
    }

    /// Bound the accumulation buffer.
    #[must_use]
    pub const fn search_window(mut self, bytes: usize) -> Self {
        self.config.buffer.search_window = Some(bytes);
        self
    }

    /// Set the codec.
    #[must_use]
    pub const fn codec(mut self, codec: Codec) -> Self {
        self.config.codec = codec;
        self
    }

    /// Set the line ending used by `send_line`.
    #[must_use]
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.config.line_ending = line_ending;
        self
    }

    /// Set the initial terminal echo.
    #[must_use]
    pub const fn echo(mut self, enabled: bool) -> Self {
        self.config.echo = enabled;
        self
    }

    /// The configuration built so far.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Check the command and configuration without spawning.
    ///
    /// # Errors
    ///
    /// [`SpawnError::EmptyCommand`] if no command was set, or a
    /// configuration error.
    pub fn validate(&self) -> Result<()> {
        match &self.command {
            Some(command) if !command.trim().is_empty() => {}
            _ => return Err(SpawnError::EmptyCommand.into()),
        }
        self.config.validate()
    }

    /// Spawn the session.
    ///
    /// # Errors
    ///
    /// As for [`validate`](Self::validate), plus any spawn failure.
    #[cfg(unix)]
    pub async fn spawn(self) -> Result<Session<PtyTransport>> {
        self.validate()?;
        let command = self.command.unwrap_or_default();
        Session::spawn_with_config(&command, &self.args, self.config).await
    }
}

impl From<SessionBuilder> for SessionConfig {
    fn from(builder: SessionBuilder) -> Self {
        builder.config
    }
}
