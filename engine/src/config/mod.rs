//! Configuration management
//!
//! This module handles loading, validation, and management of the AgriSage
//! configuration. Configuration is stored in TOML format at
//! ~/.agrisage/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: log level
//! - **llm**: provider order and per-provider settings
//! - **planning**: quality threshold and refinement cap
//! - **memory**: sliding window size and display truncation
//!
//! The Gemini API key is never stored here; it is read from the
//! `GEMINI_API_KEY` environment variable when the provider is built.
//!
//! # Examples
//!
//! ```no_run
//! use agrisage_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Quality threshold: {}", config.planning.quality_threshold);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound accepted for `planning.max_refinement_iterations`
const MAX_REFINEMENT_CAP: u32 = 10;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Plan-reflect-refine settings
    #[serde(default)]
    pub planning: PlanningConfig,

    /// Conversation memory settings
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider tried first (ollama, gemini)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Try the remaining providers when the default one fails
    #[serde(default = "default_true")]
    pub failover: bool,

    /// HTTP timeout per completion request (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Gemini provider settings
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
    // Note: API key read from GEMINI_API_KEY, not stored in config
}

/// Plan-reflect-refine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Minimum overall score for unconditional approval (0.0-1.0)
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,

    /// Maximum number of refinement passes
    #[serde(default = "default_max_refinement_iterations")]
    pub max_refinement_iterations: u32,
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Number of exchanges kept verbatim before compaction
    #[serde(default = "default_max_detailed_conversations")]
    pub max_detailed_conversations: usize,

    /// Characters of each response shown in `recent_conversations`
    #[serde(default = "default_response_preview_chars")]
    pub response_preview_chars: usize,

    /// Characters of each response sent to the summarizer
    #[serde(default = "default_summary_input_chars")]
    pub summary_input_chars: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-001".to_string()
}

fn default_quality_threshold() -> f64 {
    0.75
}

fn default_max_refinement_iterations() -> u32 {
    2
}

fn default_max_detailed_conversations() -> usize {
    8
}

fn default_response_preview_chars() -> usize {
    200
}

fn default_summary_input_chars() -> usize {
    300
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            failover: true,
            request_timeout_secs: default_request_timeout(),
            ollama: OllamaConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            max_refinement_iterations: default_max_refinement_iterations(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_detailed_conversations: default_max_detailed_conversations(),
            response_preview_chars: default_response_preview_chars(),
            summary_input_chars: default_summary_input_chars(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.agrisage/config.toml)
    ///
    /// If the configuration file doesn't exist, writes a default one first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, TOML parsing
    /// fails, or validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    pub fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.agrisage/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".agrisage").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["ollama", "gemini"];
        if !valid_providers.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                valid_providers.join(", ")
            )));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(EngineError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let threshold = self.planning.quality_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::Config(
                "quality_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.planning.max_refinement_iterations > MAX_REFINEMENT_CAP {
            return Err(EngineError::Config(format!(
                "max_refinement_iterations must be at most {}",
                MAX_REFINEMENT_CAP
            )));
        }

        if self.memory.max_detailed_conversations == 0 {
            return Err(EngineError::Config(
                "max_detailed_conversations must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.default_provider, "ollama");
        assert_eq!(config.planning.quality_threshold, 0.75);
        assert_eq!(config.planning.max_refinement_iterations, 2);
        assert_eq!(config.memory.max_detailed_conversations, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
[planning]
quality_threshold = 0.8
"#,
        )
        .unwrap();

        assert_eq!(config.planning.quality_threshold, 0.8);
        assert_eq!(config.planning.max_refinement_iterations, 2);
        assert_eq!(config.memory.response_preview_chars, 200);
        assert_eq!(config.llm.ollama.model, "llama3.1:8b");
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let err = Config::from_toml_str("[planning]\nquality_threshold = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("quality_threshold"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = Config::from_toml_str("[llm]\ndefault_provider = \"openai\"\n").unwrap_err();
        assert!(err.to_string().contains("Invalid default provider"));
    }

    #[test]
    fn test_rejects_zero_window() {
        let err =
            Config::from_toml_str("[memory]\nmax_detailed_conversations = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_detailed_conversations"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(
            config.planning.max_refinement_iterations,
            deserialized.planning.max_refinement_iterations
        );
    }
}
