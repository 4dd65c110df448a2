use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable consulted when `openai.api_key` is not set.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub jobs: JobsConfig,
    pub media: MediaConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted upload, in megabytes.
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub transcription_model: String,
    pub summary_model: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Number of jobs allowed to run the pipeline at the same time.
    pub max_concurrent: usize,
    /// Capacity of the submission queue in front of the dispatcher.
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Explicit ffmpeg binary. Looked up on PATH when unset.
    pub ffmpeg_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where the database and stored recordings live.
    pub data_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_mb: 500,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            transcription_model: "whisper-1".to_string(),
            summary_model: "gpt-5-nano".to_string(),
            request_timeout_seconds: 600,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            queue_capacity: 64,
        }
    }
}

impl OpenAiConfig {
    /// API key from the config file, falling back to the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir)),
            _ => global::data_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&global::config_file()?)
    }

    /// Load the config at `config_path`, writing the defaults there first if
    /// the file does not exist yet.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.openai.transcription_model, "whisper-1");
        assert_eq!(config.jobs.max_concurrent, 2);
        assert!(config.media.ffmpeg_path.is_none());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[jobs]\nmax_concurrent = 8\n\n[server]\nport = 9000\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.jobs.max_concurrent, 8);
        assert_eq!(config.jobs.queue_capacity, 64);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.openai.summary_model, "gpt-5-nano");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[jobs\nmax_concurrent = ").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_configured_api_key_wins() {
        let openai = OpenAiConfig {
            api_key: Some("sk-config".to_string()),
            ..OpenAiConfig::default()
        };
        assert_eq!(openai.resolved_api_key(), Some("sk-config".to_string()));
    }

    #[test]
    fn test_explicit_data_dir() {
        let storage = StorageConfig {
            data_dir: Some("/srv/recap".to_string()),
        };
        assert_eq!(
            storage.resolved_data_dir().unwrap(),
            PathBuf::from("/srv/recap")
        );
    }

    #[test]
    fn test_max_upload_bytes() {
        let mut config = Config::default();
        config.server.max_upload_mb = 2;
        assert_eq!(config.max_upload_bytes(), 2 * 1024 * 1024);
    }
}
