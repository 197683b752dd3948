//! Assistant configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/walletfy/config/assistant.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default value.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::dates::Locale;
use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/assistant.toml");

/// Summary budget and conversation window for one chat attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub size_budget: usize,
    pub history_turns: usize,
}

/// How much context is sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub primary: ContextLimits,
    /// Used for the single retry after a context-window overflow
    pub fallback: ContextLimits,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            primary: ContextLimits {
                size_budget: 3400,
                history_turns: 6,
            },
            fallback: ContextLimits {
                size_budget: 3000,
                history_turns: 3,
            },
        }
    }
}

/// Sampling parameters and limits of the chat model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Context window in estimated tokens, if known
    pub context_window: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "llama3.2".to_string(),
            temperature: 0.3,
            top_p: 0.85,
            max_tokens: 600,
            timeout: Duration::from_secs(120),
            context_window: None,
        }
    }
}

/// Full assistant configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantConfig {
    pub context: ContextConfig,
    pub model: ModelConfig,
    pub locale: Locale,
}

impl AssistantConfig {
    /// Load from the default override location, else the embedded defaults
    pub fn load() -> Result<Self> {
        load_config(default_config_path().as_deref())
    }

    /// Load from a specific override file (missing file means defaults)
    pub fn from_path(path: &Path) -> Result<Self> {
        load_config(Some(path))
    }

    /// Parse TOML content on top of the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("walletfy").join("config").join("assistant.toml"))
}

fn load_config(override_path: Option<&Path>) -> Result<AssistantConfig> {
    let content = match override_path {
        Some(path) if path.exists() => fs::read_to_string(path)
            .map_err(|e| Error::InvalidData(format!("Failed to read config: {}", e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    context: Option<RawContext>,
    model: Option<RawModel>,
    display: Option<RawDisplay>,
}

#[derive(Debug, Deserialize)]
struct RawContext {
    size_budget: Option<usize>,
    fallback_size_budget: Option<usize>,
    history_turns: Option<usize>,
    fallback_history_turns: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    name: Option<String>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    context_window: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawDisplay {
    locale: Option<String>,
}

fn parse_config(content: &str) -> Result<AssistantConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::InvalidData(format!("Invalid config TOML: {}", e)))?;

    let mut config = AssistantConfig::default();

    if let Some(context) = raw.context {
        if let Some(budget) = context.size_budget {
            config.context.primary.size_budget = budget;
        }
        if let Some(budget) = context.fallback_size_budget {
            config.context.fallback.size_budget = budget;
        }
        if let Some(turns) = context.history_turns {
            config.context.primary.history_turns = turns;
        }
        if let Some(turns) = context.fallback_history_turns {
            config.context.fallback.history_turns = turns;
        }
    }

    if let Some(model) = raw.model {
        if let Some(name) = model.name {
            config.model.name = name;
        }
        if let Some(temperature) = model.temperature {
            config.model.temperature = temperature;
        }
        if let Some(top_p) = model.top_p {
            config.model.top_p = top_p;
        }
        if let Some(max_tokens) = model.max_tokens {
            config.model.max_tokens = max_tokens;
        }
        if let Some(timeout) = model.timeout_secs {
            config.model.timeout = Duration::from_secs(timeout);
        }
        config.model.context_window = model.context_window;
    }

    if let Some(display) = raw.display {
        if let Some(locale) = display.locale {
            config.locale = locale.parse().map_err(Error::InvalidData)?;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &AssistantConfig) -> Result<()> {
    let ctx = &config.context;
    if ctx.fallback.size_budget > ctx.primary.size_budget {
        return Err(Error::InvalidData(format!(
            "fallback_size_budget ({}) must not exceed size_budget ({})",
            ctx.fallback.size_budget, ctx.primary.size_budget
        )));
    }
    if ctx.fallback.history_turns > ctx.primary.history_turns {
        return Err(Error::InvalidData(format!(
            "fallback_history_turns ({}) must not exceed history_turns ({})",
            ctx.fallback.history_turns, ctx.primary.history_turns
        )));
    }
    if !(0.0..=2.0).contains(&config.model.temperature) {
        return Err(Error::InvalidData(format!(
            "temperature must be within 0.0..=2.0, got {}",
            config.model.temperature
        )));
    }
    if !(0.0..=1.0).contains(&config.model.top_p) {
        return Err(Error::InvalidData(format!(
            "top_p must be within 0.0..=1.0, got {}",
            config.model.top_p
        )));
    }
    Ok(())
}
