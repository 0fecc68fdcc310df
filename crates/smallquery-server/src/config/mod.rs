//! Server configuration.
//!
//! This module provides configuration management for the SmallQuery daemon.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use smallquery_common::{DEFAULT_QUERY_FUNCTION, DEFAULT_UPLOAD_FUNCTION, LOG_TAIL_BYTES};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL of the data bucket uploads are written to and queries read from.
    #[serde(default = "default_data_url")]
    pub data_url: String,

    /// Name the query function is served under.
    #[serde(default = "default_query_function")]
    pub query_function: String,

    /// Name the upload function is served under.
    #[serde(default = "default_upload_function")]
    pub upload_function: String,

    /// Maximum size of the log tail returned to callers.
    #[serde(default = "default_log_tail_bytes")]
    pub log_tail_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_data_url() -> String {
    "file:///tmp/smallquery/data".to_string()
}

fn default_query_function() -> String {
    DEFAULT_QUERY_FUNCTION.to_string()
}

fn default_upload_function() -> String {
    DEFAULT_UPLOAD_FUNCTION.to_string()
}

fn default_log_tail_bytes() -> usize {
    LOG_TAIL_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_url: default_data_url(),
            query_function: default_query_function(),
            upload_function: default_upload_function(),
            log_tail_bytes: default_log_tail_bytes(),
        }
    }
}

impl ServerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Converts configuration to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the listen address as `host:port`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.data_url, "file:///tmp/smallquery/data");
        assert_eq!(config.query_function, DEFAULT_QUERY_FUNCTION);
        assert_eq!(config.log_tail_bytes, 4096);
        assert_eq!(config.listen_addr(), "127.0.0.1:3001");
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            port = 9001
            data_url = "s3://query-data"
        "#;

        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.data_url, "s3://query-data");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.upload_function, DEFAULT_UPLOAD_FUNCTION);
    }

    #[test]
    fn test_toml_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("smallqueryd.toml");

        let mut config = ServerConfig::default();
        config.query_function = "custom".to_string();
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = ServerConfig::from_file(&path).unwrap();
        assert_eq!(loaded.query_function, "custom");
    }
}
