//! Application configuration for ARRS.
//!
//! User config lives at `~/.arrs/arrs.toml`. A missing file means defaults.
//! API keys are never stored here, only the names of the env vars holding them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ArrsError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "arrs.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".arrs";

// ---------------------------------------------------------------------------
// Config structs (matching arrs.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[scoring]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Run engines concurrently on the blocking pool.
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Engines in execution order.
    #[serde(default = "default_engines")]
    pub engines: Vec<EngineConfig>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            engines: default_engines(),
        }
    }
}

/// `[[scoring.engines]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine name: `ADE`, `ARCE` or `TRE`.
    pub name: String,
    /// Composite weight, 0.0 to 1.0. Weights need not sum to 1.
    pub weight: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_engines() -> Vec<EngineConfig> {
    [("ADE", 0.30), ("ARCE", 0.20), ("TRE", 0.20)]
        .into_iter()
        .map(|(name, weight)| EngineConfig {
            name: name.into(),
            weight,
            enabled: true,
        })
        .collect()
}

fn default_true() -> bool {
    true
}

/// `[crawler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    #[serde(default = "default_crawler_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Fall back to the rendering service when the plain fetch fails.
    #[serde(default = "default_true")]
    pub render_fallback: bool,

    /// Headless-browser rendering service that accepts `POST {"url": ...}`.
    #[serde(default = "default_render_endpoint")]
    pub render_endpoint: String,

    /// Permit loopback and private-network targets.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_crawler_timeout(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            render_fallback: true,
            render_endpoint: default_render_endpoint(),
            allow_private_hosts: false,
        }
    }
}

fn default_crawler_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    "ARRS-Bot/1.0".into()
}
fn default_max_redirects() -> usize {
    5
}
fn default_render_endpoint() -> String {
    "http://localhost:3000/render".into()
}

/// Which LLM backend answers simulation prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationProvider {
    Openai,
    Claude,
    Ollama,
    None,
}

/// `[simulation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_provider")]
    pub provider: SimulationProvider,

    #[serde(default = "default_openai_key_env")]
    pub openai_api_key_env: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_anthropic_key_env")]
    pub anthropic_api_key_env: String,
    #[serde(default = "default_claude_model")]
    pub claude_model: String,
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_simulation_timeout")]
    pub timeout_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            openai_api_key_env: default_openai_key_env(),
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            anthropic_api_key_env: default_anthropic_key_env(),
            claude_model: default_claude_model(),
            anthropic_base_url: default_anthropic_base_url(),
            ollama_base_url: default_ollama_base_url(),
            ollama_model: default_ollama_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_simulation_timeout(),
        }
    }
}

fn default_provider() -> SimulationProvider {
    SimulationProvider::Openai
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openai_model() -> String {
    "gpt-4".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_claude_model() -> String {
    "claude-sonnet-4-5-20250929".into()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_ollama_model() -> String {
    "llama2".into()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_simulation_timeout() -> u64 {
    60
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file. A leading `~/` expands to the home directory.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "~/.arrs/arrs.db".into()
}

impl StorageConfig {
    /// Database path with `~/` expanded.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match self.database_path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir()
                    .ok_or_else(|| ArrsError::config("could not determine home directory"))?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.database_path)),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Reject weights outside [0, 1] and duplicate engine names.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for engine in &self.scoring.engines {
            if !(0.0..=1.0).contains(&engine.weight) {
                return Err(ArrsError::config(format!(
                    "engine {} weight {} is outside [0, 1]",
                    engine.name, engine.weight
                )));
            }
            if !seen.insert(engine.name.to_ascii_uppercase()) {
                return Err(ArrsError::config(format!(
                    "engine {} is configured more than once",
                    engine.name
                )));
            }
        }
        if self.crawler.timeout_secs == 0 {
            return Err(ArrsError::config("crawler timeout must be positive"));
        }
        Ok(())
    }
}

/// Read an API key from the env var named in config; empty counts as unset.
pub fn api_key_from_env(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.arrs/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ArrsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.arrs/arrs.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ArrsError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| ArrsError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ArrsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| ArrsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ArrsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("ARRS-Bot/1.0"));
        assert!(toml_str.contains("provider = \"openai\""));
    }

    #[test]
    fn config_roundtrip() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.scoring.engines.len(), 3);
        assert_eq!(parsed.scoring.engines[0].name, "ADE");
        assert_eq!(parsed.scoring.engines[0].weight, 0.30);
        assert_eq!(parsed.crawler.timeout_secs, 30);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[scoring]
parallel = false

[[scoring.engines]]
name = "TRE"
weight = 0.5

[simulation]
provider = "ollama"
ollama_model = "mistral"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(!config.scoring.parallel);
        assert_eq!(config.scoring.engines.len(), 1);
        assert!(config.scoring.engines[0].enabled);
        assert_eq!(config.simulation.provider, SimulationProvider::Ollama);
        assert_eq!(config.simulation.ollama_model, "mistral");
        assert_eq!(config.simulation.ollama_base_url, "http://localhost:11434");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_weight() {
        let mut config = AppConfig::default();
        config.scoring.engines[1].weight = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ARCE"));
    }

    #[test]
    fn rejects_duplicate_engine() {
        let mut config = AppConfig::default();
        config.scoring.engines.push(EngineConfig {
            name: "ade".into(),
            weight: 0.1,
            enabled: true,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("arrs_cfg_{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(&path, "[crawler]\ntimeout_secs = 10\n").expect("write config");
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.crawler.timeout_secs, 10);
        assert_eq!(config.crawler.user_agent, "ARRS-Bot/1.0");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn storage_path_expansion() {
        let config = StorageConfig {
            database_path: "/tmp/arrs.db".into(),
        };
        assert_eq!(config.resolved_path().expect("path"), PathBuf::from("/tmp/arrs.db"));
    }

    #[test]
    fn unset_api_key_reads_as_none() {
        assert!(api_key_from_env("ARRS_TEST_NONEXISTENT_KEY_12345").is_none());
    }
}
