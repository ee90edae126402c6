//! Runtime configuration loaded from the environment.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Could not load env file {path}: {message}")]
    EnvFile { path: PathBuf, message: String },
}

/// Load `.env`, or the given file when one is passed. A missing default
/// `.env` is not an error.
pub fn load_env_file(path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(path) => dotenvy::from_path(path)
            .map(|_| ())
            .map_err(|e| ConfigError::EnvFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        None => {
            dotenvy::dotenv().ok();
            Ok(())
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}

fn string_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Settings for the content pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_temperature: f32,
    pub openai_base_url: String,
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    /// Upper bound on LLM requests in flight during one run.
    pub generation_concurrency: usize,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let openai_api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let generation_concurrency =
            parse_or(&lookup, "GENERATION_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        if generation_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "GENERATION_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            openai_api_key,
            openai_model: string_or(&lookup, "OPENAI_MODEL", DEFAULT_MODEL),
            openai_temperature: parse_or(&lookup, "OPENAI_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            openai_base_url: string_or(&lookup, "OPENAI_BASE_URL", DEFAULT_BASE_URL),
            output_dir: PathBuf::from(string_or(&lookup, "OUTPUT_DIR", "output")),
            temp_dir: PathBuf::from(string_or(&lookup, "TEMP_DIR", "temp")),
            generation_concurrency,
        })
    }

    /// Create the output and temp directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::create_dir_all(&self.temp_dir)
    }
}

/// Settings for the web server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub upload_folder: PathBuf,
    pub max_upload_bytes: usize,
    pub pipeline: PipelineConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            host: string_or(&lookup, "HOST", "0.0.0.0"),
            port: parse_or(&lookup, "PORT", 5000)?,
            upload_folder: PathBuf::from(string_or(&lookup, "UPLOAD_FOLDER", "uploads")),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            pipeline: PipelineConfig::from_lookup(&lookup)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_pipeline_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.openai_model, "gpt-4");
        assert_eq!(config.openai_temperature, 0.7);
        assert_eq!(config.openai_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.temp_dir, PathBuf::from("temp"));
        assert_eq!(config.generation_concurrency, 4);
    }

    #[test]
    fn test_missing_api_key() {
        let err = PipelineConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OPENAI_API_KEY")));
        assert_eq!(err.to_string(), "OPENAI_API_KEY must be set");
    }

    #[test]
    fn test_invalid_temperature() {
        let err = PipelineConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_TEMPERATURE", "warm"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "OPENAI_TEMPERATURE", .. }));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = PipelineConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("GENERATION_CONCURRENCY", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "GENERATION_CONCURRENCY", .. }));
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "postgres://localhost/study"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.upload_folder, PathBuf::from("uploads"));
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn test_server_requires_database_url() {
        let err = ServerConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }
}
