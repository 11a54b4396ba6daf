//! Shim configuration
//!
//! The well-known paths and bounds the shim relies on, loadable from a TOML
//! file. The defaults reproduce the values existing callers expect: devd's
//! seqpacket socket, device nodes under `/dev/input`, and a 100-node scan
//! range.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// Shim configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of devd's seqpacket notification socket.
    #[serde(default = "default_devd_socket")]
    pub devd_socket: PathBuf,

    /// Root of the device filesystem; event nodes live at
    /// `<dev_root>/input/eventN`.
    #[serde(default = "default_dev_root")]
    pub dev_root: PathBuf,

    /// Exclusive upper bound of the event-node index scan range.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: u32,

    /// Listener poll timeout in milliseconds; bounds reconnect latency and
    /// shutdown responsiveness.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u16,
}

fn default_devd_socket() -> PathBuf {
    PathBuf::from("/var/run/devd.seqpacket.pipe")
}

fn default_dev_root() -> PathBuf {
    PathBuf::from("/dev")
}

fn default_scan_limit() -> u32 {
    100
}

fn default_poll_interval_ms() -> u16 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            devd_socket: default_devd_socket(),
            dev_root: default_dev_root(),
            scan_limit: default_scan_limit(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.devd_socket,
            PathBuf::from("/var/run/devd.seqpacket.pipe")
        );
        assert_eq!(config.dev_root, PathBuf::from("/dev"));
        assert_eq!(config.scan_limit, 100);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("scan_limit = 8\n").unwrap();
        assert_eq!(config.scan_limit, 8);
        assert_eq!(config.dev_root, PathBuf::from("/dev"));
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_full_toml() {
        let text = r#"
            devd_socket = "/tmp/devd.pipe"
            dev_root = "/tmp/dev"
            scan_limit = 4
            poll_interval_ms = 50
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.devd_socket, PathBuf::from("/tmp/devd.pipe"));
        assert_eq!(config.dev_root, PathBuf::from("/tmp/dev"));
        assert_eq!(config.scan_limit, 4);
        assert_eq!(config.poll_interval_ms, 50);
    }
}
