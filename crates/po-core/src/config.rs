use crate::error::{PoError, Result};
use completion_client::{CompletionOptions, OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "po.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// CompletionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    CompletionOptions::default().temperature
}

fn default_max_tokens() -> u32 {
    CompletionOptions::default().max_tokens
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CompletionConfig {
    pub fn options(&self) -> CompletionOptions {
        CompletionOptions::default()
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Connection settings for an [`completion_client::OpenAiClient`].
    /// Fails when no API key is configured.
    pub fn client_config(&self) -> Result<OpenAiConfig> {
        let key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                PoError::validation("no completion API key configured (set OPENAI_API_KEY)")
            })?;
        Ok(OpenAiConfig::new(key)
            .with_model(&self.model)
            .with_base_url(&self.base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs)))
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_url")]
    pub url: String,
}

fn default_storage_url() -> String {
    "memory://".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: default_storage_url(),
        }
    }
}

/// Where entity records live, decoded from `storage.url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Redb(PathBuf),
}

impl StorageConfig {
    /// `memory://` selects in-process storage; `redb://<path>` or a bare
    /// path selects a redb file. Any other scheme is rejected.
    pub fn backend(&self) -> Result<StorageBackend> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(PoError::validation("storage.url is empty"));
        }
        if url == "memory://" || url == "memory" {
            return Ok(StorageBackend::Memory);
        }
        if let Some(path) = url.strip_prefix("redb://") {
            if path.is_empty() {
                return Err(PoError::validation("storage.url 'redb://' needs a path"));
            }
            return Ok(StorageBackend::Redb(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = url.split_once("://") {
            return Err(PoError::validation(format!(
                "unsupported storage scheme '{scheme}'"
            )));
        }
        Ok(StorageBackend::Redb(PathBuf::from(url)))
    }
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

/// Connection details for an external cache. Carried for deployments that
/// front the store with one; nothing in the workflows reads through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_host")]
    pub host: String,
    #[serde(default = "default_cache_port")]
    pub port: u16,
}

fn default_cache_host() -> String {
    "localhost".to_string()
}

fn default_cache_port() -> u16 {
    6379
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: default_cache_host(),
            port: default_cache_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    #[default]
    Standard,
    Advanced,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Standard => "standard",
            AgentKind::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = PoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(AgentKind::Standard),
            "advanced" => Ok(AgentKind::Advanced),
            _ => Err(PoError::validation(format!("unknown agent kind '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub kind: AgentKind,
}

// ---------------------------------------------------------------------------
// TrainingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Samples kept per category before the oldest is evicted.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    1000
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

impl Config {
    /// Load configuration: the YAML file if it exists (defaults otherwise),
    /// then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or(Path::new(CONFIG_FILE));
        let mut cfg = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            Self::from_yaml(&data)?
        } else {
            Config::default()
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Overlay values from the environment. `lookup` resolves a variable
    /// name; empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.completion.api_key = Some(v);
        }
        if let Some(v) = get("PO_COMPLETION_BASE_URL") {
            self.completion.base_url = v;
        }
        if let Some(v) = get("PO_COMPLETION_MODEL") {
            self.completion.model = v;
        }
        if let Some(v) = get("DATABASE_URL") {
            self.storage.url = v;
        }
        if let Some(v) = get("REDIS_HOST") {
            self.cache.host = v;
        }
        if let Some(v) = get("REDIS_PORT") {
            self.cache.port = v
                .trim()
                .parse()
                .map_err(|_| PoError::validation(format!("REDIS_PORT '{v}' is not a port")))?;
        }
        if let Some(v) = get("PO_AGENT") {
            self.agent.kind = v.parse()?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let has_key = self
            .completion
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if !has_key {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "no completion API key (completion.api_key / OPENAI_API_KEY); \
                          analysis commands will fail"
                    .to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.completion.temperature) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "completion.temperature={} is outside 0..=2",
                    self.completion.temperature
                ),
            });
        }

        if self.completion.max_tokens == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "completion.max_tokens is 0".to_string(),
            });
        }

        if let Err(e) = self.storage.backend() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            });
        }

        if self.training.capacity == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "training.capacity is 0; no history will be kept".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.completion.model, "gpt-4");
        assert_eq!(cfg.completion.temperature, 0.7);
        assert_eq!(cfg.completion.max_tokens, 2000);
        assert_eq!(cfg.completion.timeout_secs, 60);
        assert_eq!(cfg.cache.host, "localhost");
        assert_eq!(cfg.cache.port, 6379);
        assert_eq!(cfg.agent.kind, AgentKind::Standard);
        assert_eq!(cfg.training.capacity, 1000);
        assert_eq!(cfg.storage.backend().unwrap(), StorageBackend::Memory);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "completion:\n  model: gpt-4o\nagent:\n  kind: advanced\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.completion.model, "gpt-4o");
        assert_eq!(cfg.completion.max_tokens, 2000);
        assert_eq!(cfg.agent.kind, AgentKind::Advanced);
        assert_eq!(cfg.storage.url, "memory://");
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::from_yaml("storage:\n  url: memory://\n").unwrap();
        cfg.apply_env(env(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "redb:///tmp/po.redb"),
            ("REDIS_PORT", "6380"),
            ("PO_AGENT", "Advanced"),
            ("PO_COMPLETION_MODEL", ""),
        ]))
        .unwrap();
        assert_eq!(cfg.completion.api_key.as_deref(), Some("sk-test"));
        assert_eq!(
            cfg.storage.backend().unwrap(),
            StorageBackend::Redb(PathBuf::from("/tmp/po.redb"))
        );
        assert_eq!(cfg.cache.port, 6380);
        assert_eq!(cfg.agent.kind, AgentKind::Advanced);
        assert_eq!(cfg.completion.model, "gpt-4");
    }

    #[test]
    fn bad_port_is_validation_error() {
        let mut cfg = Config::default();
        let err = cfg.apply_env(env(&[("REDIS_PORT", "not-a-port")])).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn storage_url_forms() {
        let backend = |url: &str| {
            StorageConfig {
                url: url.to_string(),
            }
            .backend()
        };
        assert_eq!(backend("memory://").unwrap(), StorageBackend::Memory);
        assert_eq!(
            backend("data/po.redb").unwrap(),
            StorageBackend::Redb(PathBuf::from("data/po.redb"))
        );
        assert!(backend("postgres://localhost/po").is_err());
        assert!(backend("redb://").is_err());
    }

    #[test]
    fn validate_flags_missing_key_and_bad_values() {
        let mut cfg = Config::default();
        cfg.completion.temperature = 3.5;
        cfg.completion.max_tokens = 0;
        cfg.training.capacity = 0;
        let messages: Vec<_> = cfg.validate().into_iter().map(|w| w.message).collect();
        assert_eq!(messages.len(), 4);
        assert!(messages.iter().any(|m| m.contains("API key")));
        assert!(messages.iter().any(|m| m.contains("temperature")));
        assert!(messages.iter().any(|m| m.contains("max_tokens")));
        assert!(messages.iter().any(|m| m.contains("capacity")));
    }

    #[test]
    fn validate_clean_config() {
        let mut cfg = Config::default();
        cfg.completion.api_key = Some("sk-test".into());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn client_config_requires_key() {
        let cfg = Config::default();
        assert!(cfg.completion.client_config().is_err());

        let mut cfg = Config::default();
        cfg.completion.api_key = Some("sk-test".into());
        cfg.completion.timeout_secs = 5;
        let client = cfg.completion.client_config().unwrap();
        assert_eq!(client.model, "gpt-4");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("po.yaml");
        let mut cfg = Config::default();
        cfg.storage.url = "redb://po.redb".into();
        cfg.training.capacity = 50;
        cfg.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("api_key"));
        let loaded = Config::from_yaml(&text).unwrap();
        assert_eq!(loaded.storage.url, "redb://po.redb");
        assert_eq!(loaded.training.capacity, 50);
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(Some(&dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(cfg.completion.max_tokens, 2000);
    }
}
