//! Runtime settings, read from a [ron] file.
//!
//! Every field is optional in the file; missing ones take their defaults.
//!
//! ```text
//! (
//!     baud_rate: 115200,
//!     drain_timeout_ms: 1,
//!     deadline_ms: 7000,
//!     poll_interval_ms: 50,
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, fs, path::Path, time::Duration};

use crate::{
    acquisition::DEFAULT_DEADLINE, scheduler::DEFAULT_POLL_INTERVAL,
    serial_channel::DEFAULT_BAUD_RATE,
};

/// Settings for talking to the goniometer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial baud rate
    pub baud_rate: u32,
    /// Longest a single read may wait while draining the port
    pub drain_timeout_ms: u64,
    /// Read window after arming the device
    pub deadline_ms: u64,
    /// Time between polls
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            drain_timeout_ms: 1,
            deadline_ms: DEFAULT_DEADLINE.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl Config {
    /// Reads a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Parses config text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// The read window.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// The tick cadence.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The per-read timeout while draining.
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Returned when a config file cannot be used.
#[derive(Debug)]
pub enum ConfigError {
    /// Returned when the file cannot be read.
    IoError(std::io::Error),

    /// Returned when the file is not valid config RON.
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            ConfigError::IoError(error) => Cow::from(format!("io error: {}", error)),
            ConfigError::RonSpannedError(error) => Cow::from(format!("config error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<ron::de::SpannedError> for ConfigError {
    fn from(value: ron::de::SpannedError) -> Self {
        Self::RonSpannedError(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.deadline(), Duration::from_millis(7000));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_ron("(deadline_ms: 3000)").unwrap();
        assert_eq!(config.deadline_ms, 3000);
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.poll_interval_ms, 50);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(baud_rate: 9600, poll_interval_ms: 20)").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
        assert_eq!(config.deadline_ms, 7000);
    }

    #[test]
    fn bad_files() {
        assert!(matches!(
            Config::from_ron("(baud_rate: \"fast\")"),
            Err(ConfigError::RonSpannedError(_))
        ));
        assert!(matches!(
            Config::load("/definitely/not/here.ron"),
            Err(ConfigError::IoError(_))
        ));
    }
}
