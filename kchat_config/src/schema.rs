use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use kchat_core::{DEFAULT_HISTORY_LIMIT, DEFAULT_NEW_SEARCH_PREFIX};

use crate::ConfigError;

pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";
pub const ENV_ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const ENV_AWS_REGION: &str = "AWS_REGION";
pub const ENV_KENDRA_INDEX_ID: &str = "KENDRA_INDEX_ID";
pub const ENV_KENDRA_ENDPOINT: &str = "KENDRA_ENDPOINT";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnthropicConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "AnthropicConfig::default_model")]
    pub model: String,
    #[serde(default = "AnthropicConfig::default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: Self::default_model(),
            max_tokens: Self::default_max_tokens(),
            temperature: 0.0,
            base_url: None,
        }
    }
}

impl AnthropicConfig {
    fn default_model() -> String {
        "claude-3-haiku-20240307".to_string()
    }

    const fn default_max_tokens() -> u32 {
        512
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub kendra: KendraConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KendraConfig {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub index_id: String,
    #[serde(default = "KendraConfig::default_top_k")]
    pub top_k: usize,
    /// Overrides `https://kendra.{region}.amazonaws.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for KendraConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            index_id: String::new(),
            top_k: Self::default_top_k(),
            endpoint: None,
        }
    }
}

impl KendraConfig {
    const fn default_top_k() -> usize {
        3
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "ChatConfig::default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "ChatConfig::default_new_search_prefix")]
    pub new_search_prefix: String,
    #[serde(default = "ChatConfig::default_color")]
    pub color: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: Self::default_history_limit(),
            new_search_prefix: Self::default_new_search_prefix(),
            color: Self::default_color(),
        }
    }
}

impl ChatConfig {
    const fn default_history_limit() -> usize {
        DEFAULT_HISTORY_LIMIT
    }

    fn default_new_search_prefix() -> String {
        DEFAULT_NEW_SEARCH_PREFIX.to_string()
    }

    const fn default_color() -> bool {
        true
    }
}

impl Config {
    /// Directory holding `config.json`.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        Ok(dirs::home_dir().ok_or(ConfigError::NoHomeDir)?.join("kchat"))
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load the effective configuration: file, then process environment.
    ///
    /// An explicit `path` must exist. Without one, `~/kchat/config.json` is
    /// used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No config file at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Overlay non-empty environment values looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_ANTHROPIC_API_KEY) {
            self.providers.anthropic.api_key = v;
        }
        if let Some(v) = get(ENV_ANTHROPIC_MODEL) {
            self.providers.anthropic.model = v;
        }
        if let Some(v) = get(ENV_ANTHROPIC_BASE_URL) {
            self.providers.anthropic.base_url = Some(v);
        }
        if let Some(v) = get(ENV_AWS_REGION) {
            self.retrieval.kendra.region = v;
        }
        if let Some(v) = get(ENV_KENDRA_INDEX_ID) {
            self.retrieval.kendra.index_id = v;
        }
        if let Some(v) = get(ENV_KENDRA_ENDPOINT) {
            self.retrieval.kendra.endpoint = Some(v);
        }
    }

    /// Only the model credential is checked here. Region and index problems
    /// show up as retrieval failures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.anthropic.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential(ENV_ANTHROPIC_API_KEY));
        }
        Ok(())
    }

    pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.clone(),
            source,
        })?;
        Ok(config_dir)
    }

    pub fn create_config() -> Result<PathBuf, ConfigError> {
        let config_path = Self::ensure_config_dir()?.join("config.json");
        Self::write_template(&config_path)?;

        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("   1. Add your Anthropic API key (or export ANTHROPIC_API_KEY)");
        println!("   2. Set the Kendra region and index id (or AWS_REGION / KENDRA_INDEX_ID)");
        println!("   3. Run 'aws configure' or export AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY");
        println!("   4. Run 'kchat' to start a conversation");
        println!();
        Ok(config_path)
    }

    /// Write the template to `path`, refusing to overwrite.
    pub fn write_template(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        std::fs::write(path, CONFIG_TEMPLATE).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

const CONFIG_TEMPLATE: &str = r#"{
  "providers": {
    "anthropic": {
      "api_key": "your-anthropic-api-key-here",
      "model": "claude-3-haiku-20240307",
      "max_tokens": 512,
      "temperature": 0.0
    }
  },
  "retrieval": {
    "kendra": {
      "region": "us-east-1",
      "index_id": "your-kendra-index-id",
      "top_k": 3
    }
  },
  "chat": {
    "history_limit": 5,
    "new_search_prefix": "new search:",
    "color": true
  }
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.chat.history_limit, 5);
        assert_eq!(config.chat.new_search_prefix, "new search:");
        assert!(config.chat.color);
        assert_eq!(config.providers.anthropic.max_tokens, 512);
        assert!(config.providers.anthropic.temperature.abs() < f32::EPSILON);
        assert_eq!(config.retrieval.kendra.top_k, 3);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("AWS_REGION", "eu-west-1"),
            ("KENDRA_INDEX_ID", "idx-123"),
            ("KENDRA_ENDPOINT", ""),
        ]));

        assert_eq!(config.providers.anthropic.api_key, "sk-test");
        assert_eq!(config.retrieval.kendra.region, "eu-west-1");
        assert_eq!(config.retrieval.kendra.index_id, "idx-123");
        assert!(config.retrieval.kendra.endpoint.is_none());
    }

    #[test]
    fn test_missing_credential_is_fatal() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("ANTHROPIC_API_KEY")));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_region_and_index_are_not_validated() {
        let mut config = Config::default();
        config.apply_env(env(&[("ANTHROPIC_API_KEY", "sk-test")]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"chat": {"history_limit": 2}}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.chat.history_limit, 2);
        assert_eq!(config.chat.new_search_prefix, "new search:");
        assert_eq!(config.retrieval.kendra.top_k, 3);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_template_parses_and_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        Config::write_template(&path).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.retrieval.kendra.region, "us-east-1");
        assert_eq!(config.chat.history_limit, 5);

        let err = Config::write_template(&path).unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists(_)));
    }
}
