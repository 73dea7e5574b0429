//! Environment-based configuration overrides.
//!
//! Recognised variables (with the default `PTYSCRIPT` prefix):
//!
//! | variable                  | effect                              |
//! |---------------------------|-------------------------------------|
//! | `PTYSCRIPT_TIMEOUT_MS`    | default expect timeout              |
//! | `PTYSCRIPT_SEARCH_WINDOW` | search window in bytes, `0` = none  |
//! | `PTYSCRIPT_CODEC`         | codec name, e.g. `utf-8`, `raw`     |
//! | `PTYSCRIPT_LINE_ENDING`   | `lf`, `crlf` or `cr`                |
//! | `PTYSCRIPT_ECHO`          | initial echo, boolean               |
//! | `PTYSCRIPT_CONFIG`        | path of a TOML file applied first   |

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::SessionConfig;
use super::file::ConfigFile;
use crate::error::{ExpectError, Result};

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "PTYSCRIPT";

/// Variable names, without prefix.
pub mod vars {
    /// Default expect timeout in milliseconds.
    pub const TIMEOUT_MS: &str = "TIMEOUT_MS";
    /// Search window in bytes.
    pub const SEARCH_WINDOW: &str = "SEARCH_WINDOW";
    /// Codec name.
    pub const CODEC: &str = "CODEC";
    /// Line ending name.
    pub const LINE_ENDING: &str = "LINE_ENDING";
    /// Initial echo state.
    pub const ECHO: &str = "ECHO";
    /// Path of a TOML configuration file.
    pub const CONFIG: &str = "CONFIG";
}

/// Reader for prefixed environment variables.
///
/// Reads the process environment by default; [`EnvConfig::from_vars`]
/// substitutes a fixed map.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    prefix: String,
    vars: Option<HashMap<String, String>>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Read the process environment with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vars: None,
        }
    }

    /// Read from a fixed set of variables instead of the process environment.
    #[must_use]
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a raw value. Empty values count as unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let key = self.var_name(name);
        let value = match &self.vars {
            Some(vars) => vars.get(&key).cloned(),
            None => std::env::var(&key).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Get a parsed value, failing on malformed input.
    pub fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map(|raw| {
                raw.trim().parse().map_err(|e| {
                    ExpectError::config(format!("{}={raw:?}: {e}", self.var_name(name)))
                })
            })
            .transpose()
    }

    /// Get a boolean value.
    pub fn bool(&self, name: &str) -> Result<Option<bool>> {
        self.get(name)
            .map(|raw| match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ExpectError::config(format!(
                    "{}={raw:?}: expected a boolean",
                    self.var_name(name)
                ))),
            })
            .transpose()
    }

    /// Get a duration in milliseconds.
    pub fn duration_millis(&self, name: &str) -> Result<Option<Duration>> {
        Ok(self.parse::<u64>(name)?.map(Duration::from_millis))
    }

    /// Apply every recognised variable on top of `config`.
    ///
    /// A file named by `CONFIG` is applied first, so individual variables
    /// win over it.
    pub fn apply(&self, mut config: SessionConfig) -> Result<SessionConfig> {
        if let Some(path) = self.get(vars::CONFIG) {
            config = ConfigFile::load(PathBuf::from(path))?.apply(config);
        }
        if let Some(timeout) = self.duration_millis(vars::TIMEOUT_MS)? {
            config.timeout.default = timeout;
        }
        if let Some(window) = self.parse::<usize>(vars::SEARCH_WINDOW)? {
            config.buffer.search_window = (window > 0).then_some(window);
        }
        if let Some(codec) = self.parse(vars::CODEC)? {
            config.codec = codec;
        }
        if let Some(ending) = self.parse(vars::LINE_ENDING)? {
            config.line_ending = ending;
        }
        if let Some(echo) = self.bool(vars::ECHO)? {
            config.echo = echo;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LineEnding;
    use crate::encoding::Codec;

    fn env(pairs: &[(&str, &str)]) -> EnvConfig {
        EnvConfig::from_vars(DEFAULT_PREFIX, pairs.iter().copied())
    }

    #[test]
    fn overrides_apply() {
        let config = env(&[
            ("PTYSCRIPT_TIMEOUT_MS", "1500"),
            ("PTYSCRIPT_SEARCH_WINDOW", "2000"),
            ("PTYSCRIPT_CODEC", "latin1"),
            ("PTYSCRIPT_LINE_ENDING", "crlf"),
            ("PTYSCRIPT_ECHO", "off"),
        ])
        .apply(SessionConfig::default())
        .unwrap();

        assert_eq!(config.timeout.default, Duration::from_millis(1500));
        assert_eq!(config.buffer.search_window, Some(2000));
        assert_eq!(config.codec, Codec::Latin1);
        assert_eq!(config.line_ending, LineEnding::CrLf);
        assert!(!config.echo);
    }

    #[test]
    fn unset_and_empty_values_keep_defaults() {
        let config = env(&[("PTYSCRIPT_CODEC", "  ")])
            .apply(SessionConfig::default())
            .unwrap();
        assert_eq!(config.codec, Codec::Utf8);
        assert_eq!(config.timeout.default, crate::config::DEFAULT_TIMEOUT);
    }

    #[test]
    fn zero_window_means_unbounded() {
        let config = env(&[("PTYSCRIPT_SEARCH_WINDOW", "0")])
            .apply(SessionConfig::default().search_window(Some(10)))
            .unwrap();
        assert_eq!(config.buffer.search_window, None);
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = env(&[("PTYSCRIPT_TIMEOUT_MS", "soon")])
            .apply(SessionConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("PTYSCRIPT_TIMEOUT_MS"));

        assert!(env(&[("PTYSCRIPT_ECHO", "maybe")]).bool(vars::ECHO).is_err());
        assert!(env(&[("PTYSCRIPT_CODEC", "klingon")]).apply(SessionConfig::default()).is_err());
    }

    #[test]
    fn custom_prefix() {
        let reader = EnvConfig::from_vars("MYAPP", [("MYAPP_TIMEOUT_MS", "10")]);
        assert_eq!(
            reader.duration_millis(vars::TIMEOUT_MS).unwrap(),
            Some(Duration::from_millis(10))
        );
    }
}
