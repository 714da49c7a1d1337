//! Configuration loading, validation, and defaults for Warroom.
//!
//! Loads a `warroom.toml` file with workspace fallbacks, guardrail policy
//! inputs, and orchestrator knobs. Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fallback workspace settings when a workspace has none persisted.
    #[serde(default)]
    pub workspace: WorkspaceDefaults,

    /// Guardrail policy inputs.
    #[serde(default)]
    pub guardrails: GuardrailConfig,

    /// Orchestrator loop knobs.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Fallback workspace-level defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceDefaults {
    #[serde(default = "default_daily_budget")]
    pub default_daily_budget: f64,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_tone")]
    pub default_tone: String,

    #[serde(default = "default_objective")]
    pub default_objective: String,
}

fn default_daily_budget() -> f64 {
    50.0
}
fn default_currency() -> String {
    "USD".into()
}
fn default_tone() -> String {
    "friendly".into()
}
fn default_objective() -> String {
    "CONVERSIONS".into()
}

impl Default for WorkspaceDefaults {
    fn default() -> Self {
        Self {
            default_daily_budget: default_daily_budget(),
            currency: default_currency(),
            default_tone: default_tone(),
            default_objective: default_objective(),
        }
    }
}

/// Numeric and policy inputs consumed by the guardrail validator.
///
/// The term lists are the platform's prohibited-claim and sensitive-topic
/// vocabularies; matching is case-insensitive substring on the combined
/// creative copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Budgets above default × this multiple require confirmation.
    #[serde(default = "default_budget_multiple")]
    pub budget_multiple: f64,

    /// Copy containing any of these is blocked outright.
    #[serde(default = "default_prohibited_terms")]
    pub prohibited_terms: Vec<String>,

    /// Copy containing any of these is flagged for review, not blocked.
    #[serde(default = "default_sensitive_terms")]
    pub sensitive_terms: Vec<String>,
}

fn default_budget_multiple() -> f64 {
    5.0
}

fn default_prohibited_terms() -> Vec<String> {
    [
        "cure",
        "miracle",
        "guaranteed",
        "risk-free",
        "no risk",
        "get rich",
        "make money fast",
        "weight loss guarantee",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_sensitive_terms() -> Vec<String> {
    [
        "diet", "weight", "body", "skin", "age", "beauty", "health", "medicine", "treatment",
        "doctor",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            budget_multiple: default_budget_multiple(),
            prohibited_terms: default_prohibited_terms(),
            sensitive_terms: default_sensitive_terms(),
        }
    }
}

/// Orchestrator loop knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum reasoning/act/observe steps per turn (safety valve).
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// How many recent messages are fed to the backend each step.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Performance look-back window in days for memory assembly.
    #[serde(default = "default_performance_days")]
    pub performance_days: u32,
}

fn default_max_steps() -> u32 {
    6
}
fn default_history_window() -> usize {
    20
}
fn default_performance_days() -> u32 {
    7
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            history_window: default_history_window(),
            performance_days: default_performance_days(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific file path.
    ///
    /// A missing file is not an error — defaults apply.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.guardrails.budget_multiple < 1.0 {
            return Err(ConfigError::ValidationError(
                "guardrails.budget_multiple must be at least 1.0".into(),
            ));
        }
        if self.workspace.default_daily_budget <= 0.0 {
            return Err(ConfigError::ValidationError(
                "workspace.default_daily_budget must be positive".into(),
            ));
        }
        if self.orchestrator.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_steps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: WorkspaceDefaults::default(),
            guardrails: GuardrailConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
