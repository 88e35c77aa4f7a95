//! Configuration loading

use anatomica_core::generation::DEFAULT_TIMEOUT_SECS;
use anatomica_core::OrganKey;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "ANATOMICA_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory holding the built wasm frontend
    #[serde(default = "default_web_dir")]
    pub web_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            web_dir: default_web_dir(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_web_dir() -> String {
    "web".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Path to organ .glb files
    #[serde(default = "default_models_path")]
    pub path: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            path: default_models_path(),
        }
    }
}

fn default_models_path() -> String {
    "./assets/models".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Ask the text-generation service for labels before using the static tables
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Model endpoint, without the `:generateContent` suffix
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API key; falls back to the `ANATOMICA_API_KEY` environment variable
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_api_url(),
            api_key: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GenerationConfig {
    /// Configured key, else the environment variable, else `None`
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp".to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Organ reported by the mock classifier
    #[serde(default = "default_organ")]
    pub organ: OrganKey,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            organ: default_organ(),
        }
    }
}

fn default_organ() -> OrganKey {
    OrganKey::Liver
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.generation.timeout_secs, 10);
        assert_eq!(config.classifier.organ, OrganKey::Liver);
        assert!(config.generation.enabled);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("anatomica.toml");
        std::fs::write(
            &path,
            "[generation]\nenabled = false\ntimeout_secs = 3\n\n[classifier]\norgan = \"kidney2\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(!config.generation.enabled);
        assert_eq!(config.generation.timeout_secs, 3);
        assert_eq!(config.classifier.organ, OrganKey::Kidney2);
        assert_eq!(config.models.path, "./assets/models");
        assert!(config.generation.api_url.ends_with("gemini-2.0-flash-exp"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("anatomica.toml");
        std::fs::write(&path, "[classifier]\norgan = \"spleen\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_saved_defaults_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("anatomica.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.web_dir, "web");
        assert_eq!(config.generation.api_key, "");
    }

    #[test]
    fn test_configured_key_wins() {
        let config = GenerationConfig {
            api_key: "  abc  ".to_string(),
            ..GenerationConfig::default()
        };
        assert_eq!(config.resolved_api_key().as_deref(), Some("abc"));
    }
}
