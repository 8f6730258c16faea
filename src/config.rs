// src/config.rs

//! Environment-driven settings.
//!
//! Each field starts from a built-in default and is replaced only when the
//! corresponding variable is set to a non-empty value. Nothing is validated
//! here; an unknown log format falls back to text when the logger is built
//! (see [`LogFormat::from_selector`]).

use std::str::FromStr;

/// Overrides [`Settings::watch_file`].
pub const ENV_WATCH_FILE: &str = "FSEVENT_WATCH_FILE";
/// Overrides [`Settings::log_format`].
pub const ENV_LOG_FORMAT: &str = "FSEVENT_LOG_FORMAT";

pub const DEFAULT_WATCH_FILE: &str = "./watchFile";
pub const DEFAULT_LOG_FORMAT: &str = "TEXT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Default watch path. The CLI argument takes precedence over it.
    pub watch_file: String,
    /// Raw log format selector, e.g. `TEXT` or `json`.
    pub log_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            watch_file: DEFAULT_WATCH_FILE.to_string(),
            log_format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl Settings {
    /// Resolve settings through `lookup`, which returns an empty string for
    /// absent variables.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        let mut settings = Self::default();
        settings.apply(lookup);
        settings
    }

    /// Resolve settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).unwrap_or_default())
    }

    fn apply<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> String,
    {
        let watch_file = lookup(ENV_WATCH_FILE);
        if !watch_file.is_empty() {
            self.watch_file = watch_file;
        }
        let log_format = lookup(ENV_LOG_FORMAT);
        if !log_format.is_empty() {
            self.log_format = log_format;
        }
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_selector(&self.log_format)
    }
}

/// Textual encoding of log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable `key=value` lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Case-insensitive; anything unrecognised (including empty) is `Text`.
    pub fn from_selector(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TEXT" => Ok(LogFormat::Text),
            "JSON" => Ok(LogFormat::Json),
            other => Err(format!(
                "invalid log format: {other} (expected \"TEXT\" or \"JSON\")"
            )),
        }
    }
}
