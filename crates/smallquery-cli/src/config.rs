//! Configuration file support for the CLI.
//!
//! Loads CLI configuration from TOML files.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use smallquery_client::ClientConfig;
use smallquery_common::{DEFAULT_QUERY_FUNCTION, DEFAULT_UPLOAD_FUNCTION};

/// CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Base URL of the function invocation endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Name of the query function.
    #[serde(default = "default_query_function")]
    pub query_function: String,

    /// Name of the upload function.
    #[serde(default = "default_upload_function")]
    pub upload_function: String,

    /// URL of the data bucket holding uploads and the table mapping.
    #[serde(default)]
    pub bucket_url: Option<String>,

    /// Ask for the remote log tail with each query.
    #[serde(default = "default_capture_log")]
    pub capture_log: bool,

    /// History file path.
    #[serde(default)]
    pub history_file: Option<PathBuf>,

    /// Maximum history size.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_endpoint() -> String {
    "http://localhost:3001".to_string()
}

fn default_query_function() -> String {
    DEFAULT_QUERY_FUNCTION.to_string()
}

fn default_upload_function() -> String {
    DEFAULT_UPLOAD_FUNCTION.to_string()
}

fn default_capture_log() -> bool {
    true
}

fn default_history_size() -> usize {
    1000
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            query_function: default_query_function(),
            upload_function: default_upload_function(),
            bucket_url: None,
            capture_log: default_capture_log(),
            history_file: None,
            history_size: default_history_size(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads the default configuration file.
    ///
    /// Looks in the following locations:
    /// 1. ~/.config/smallquery/config.toml
    /// 2. ~/.smallquery/config.toml
    /// 3. Returns default if not found
    pub fn load_default() -> Result<Self> {
        // Try XDG config first
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("smallquery").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // Try home directory
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".smallquery").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // Return default configuration
        Ok(Self::default())
    }

    /// Returns the history file, falling back to the local data directory.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file
            .clone()
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("smallquery").join("history")))
    }

    /// Returns the client configuration these settings describe.
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new()
            .endpoint(&self.endpoint)
            .query_function(&self.query_function)
            .upload_function(&self.upload_function)
            .capture_log(self.capture_log);

        match &self.bucket_url {
            Some(url) => config.bucket_url(url),
            None => config,
        }
    }
}
