//! Configuration loader and validator for the FinZ content admin.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
pub const ENV_STORE_URL: &str = "FINZ_STORE_URL";
pub const ENV_STORE_KEY: &str = "FINZ_STORE_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    pub store: Store,
    #[serde(default)]
    pub storage: Storage,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct App {
    /// Replaces the built-in seed dataset when set.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

/// Hosted content store connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Store {
    pub url: String,
    pub anon_key: String,
    #[serde(default = "default_client_info")]
    pub client_info: String,
}

/// Image storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Storage {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn default_client_info() -> String {
    "finz-ecosystem@1.0.0".to_string()
}

fn default_bucket() -> String {
    "images".to_string()
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Config {
    /// Let `FINZ_STORE_URL` / `FINZ_STORE_KEY` override the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_STORE_URL).ok(),
            std::env::var(ENV_STORE_KEY).ok(),
        );
    }

    fn apply_overrides(&mut self, url: Option<String>, key: Option<String>) {
        if let Some(url) = url.filter(|v| !v.trim().is_empty()) {
            self.store.url = url;
        }
        if let Some(key) = key.filter(|v| !v.trim().is_empty()) {
            self.store.anon_key = key;
        }
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let url = cfg.store.url.trim();
    if url.is_empty() {
        return Err(ConfigError::Invalid("store.url must be non-empty"));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ConfigError::Invalid("store.url must be an http(s) URL"));
    }
    if cfg.store.anon_key.trim().is_empty() {
        return Err(ConfigError::Invalid("store.anon_key must be non-empty"));
    }
    if cfg.store.client_info.trim().is_empty() {
        return Err(ConfigError::Invalid("store.client_info must be non-empty"));
    }
    if cfg.storage.bucket.trim().is_empty() {
        return Err(ConfigError::Invalid("storage.bucket must be non-empty"));
    }
    if cfg.storage.max_upload_bytes == 0 {
        return Err(ConfigError::Invalid("storage.max_upload_bytes must be > 0"));
    }
    Ok(())
}

/// Returns the example YAML document.
pub fn example() -> &'static str {
    r#"app:
  # path to a YAML file replacing the built-in seed content
  seed_path: null

store:
  url: "https://YOUR_PROJECT.supabase.co"
  anon_key: "YOUR_SUPABASE_ANON_KEY"
  client_info: "finz-ecosystem@1.0.0"

storage:
  bucket: "images"
  max_upload_bytes: 5242880
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.storage.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(cfg.app.seed_path.is_none());
    }

    #[test]
    fn storage_section_defaults() {
        let cfg: Config = serde_yaml::from_str(
            "store:\n  url: \"https://x.supabase.co\"\n  anon_key: \"k\"\n",
        )
        .unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.storage.bucket, "images");
        assert_eq!(cfg.store.client_info, "finz-ecosystem@1.0.0");
    }

    #[test]
    fn invalid_store_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.store.anon_key = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("store.anon_key")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.store.url = "ftp://nope".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("store.url")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_storage_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.storage.bucket = " ".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.storage.max_upload_bytes = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn overrides_replace_non_empty_values_only() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.apply_overrides(Some("https://other.supabase.co".into()), Some("".into()));
        assert_eq!(cfg.store.url, "https://other.supabase.co");
        assert_eq!(cfg.store.anon_key, "YOUR_SUPABASE_ANON_KEY");
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.storage.bucket, "images");
    }
}
