//! AI-recommendation simulation for ARRS.
//!
//! A [`Simulator`] asks a language model which products it would recommend
//! for a category and use case, then reports whether the analyzed brand was
//! cited and which attributes the model says it needs. Three backends are
//! available (OpenAI, Anthropic, Ollama); [`build_simulator`] picks one from
//! configuration.

pub mod backend;
pub mod citation;
pub mod prompts;
pub mod simulator;

use std::sync::Arc;

use tracing::{info, warn};

use arrs_shared::{Result, SimulationConfig, SimulationProvider, api_key_from_env};

pub use backend::{AnthropicBackend, CompletionBackend, OllamaBackend, OpenAiBackend};
pub use citation::{Citation, CitationAnalyzer, Sentiment};
pub use simulator::{RecommendationSimulator, SimulationRequest, Simulator};

/// Build the configured simulator.
///
/// `Ok(None)` when the provider is `none` or its API key env var is unset;
/// the caller then skips simulation entirely.
pub fn build_simulator(config: &SimulationConfig) -> Result<Option<Arc<dyn Simulator>>> {
    let backend: Box<dyn CompletionBackend> = match config.provider {
        SimulationProvider::None => {
            info!("simulation disabled");
            return Ok(None);
        }
        SimulationProvider::Openai => {
            let Some(key) = api_key_from_env(&config.openai_api_key_env) else {
                warn!(env = %config.openai_api_key_env, "OpenAI API key not set; simulation disabled");
                return Ok(None);
            };
            Box::new(OpenAiBackend::new(config, key)?)
        }
        SimulationProvider::Claude => {
            let Some(key) = api_key_from_env(&config.anthropic_api_key_env) else {
                warn!(env = %config.anthropic_api_key_env, "Anthropic API key not set; simulation disabled");
                return Ok(None);
            };
            Box::new(AnthropicBackend::new(config, key)?)
        }
        SimulationProvider::Ollama => Box::new(OllamaBackend::new(config)?),
    };

    info!(provider = backend.provider(), model = backend.model(), "simulation enabled");
    Ok(Some(Arc::new(RecommendationSimulator::new(backend))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_provider_builds_nothing() {
        let config = SimulationConfig {
            provider: SimulationProvider::None,
            ..SimulationConfig::default()
        };
        assert!(build_simulator(&config).unwrap().is_none());
    }

    #[test]
    fn missing_api_key_disables_simulation() {
        let config = SimulationConfig {
            provider: SimulationProvider::Openai,
            openai_api_key_env: "ARRS_TEST_UNSET_OPENAI_KEY".into(),
            ..SimulationConfig::default()
        };
        assert!(build_simulator(&config).unwrap().is_none());
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = SimulationConfig {
            provider: SimulationProvider::Ollama,
            ..SimulationConfig::default()
        };
        let simulator = build_simulator(&config).unwrap().expect("ollama simulator");
        assert_eq!(simulator.name(), "ollama");
    }
}
