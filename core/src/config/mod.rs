//! TOML configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [endpoint]
//! base_url = "https://openrouter.ai/api/v1"
//! model = "openai/gpt-4o-mini"
//! timeout_secs = 60
//!
//! [workflow]
//! language = "spanish"
//! target_language = "english"
//! max_attempts = 3
//! run_timeout_secs = 120
//!
//! [agents.router]
//! model = "openai/gpt-4o"
//!
//! [agents.responder]
//! system_prompt = "You are a travel assistant."
//! toolpacks = ["dateutils"]
//!
//! [localization.refusals]
//! german = "Das kann ich leider nicht beantworten. Grund: {reason}"
//!
//! [localization.errors]
//! german = "Etwas ist schiefgelaufen. Bitte versuche es erneut."
//! ```
//!
//! API keys are best supplied through `AGENTFLOW_API_KEY` (or
//! `OPENAI_API_KEY`) rather than written to the file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::agents::{AgentFactory, AgentSettings};
use crate::agents::formatter::DEFAULT_SOFT_WORD_LIMIT;
use crate::bundle::RunExtras;
use crate::capability::CapabilityKind;
use crate::error::WorkflowError;
use crate::llm::LlmConfig;
use crate::localization::MessageCatalog;
use crate::registry::Registry;
use crate::tools::Toolpack;
use crate::workflow::{RetryPolicy, DEFAULT_LANGUAGE};


pub const CONFIG_FILE_NAME: &str = "agentflow.toml";

/// Root configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Chat-completions endpoint shared by every capability
    #[serde(default)]
    pub endpoint: LlmConfig,

    /// Run parameters and the outer retry policy
    #[serde(default)]
    pub workflow: WorkflowSettings,

    /// Per-capability overrides, keyed by `router`, `responder`,
    /// `translator` or `formatter`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub agents: BTreeMap<String, AgentOverride>,

    /// Extra or replacement localized texts
    #[serde(default)]
    pub localization: LocalizationConfig,
}

/// `[workflow]` section
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WorkflowSettings {
    /// Language of answers and refusal messages
    #[serde(default = "default_language")]
    pub language: String,

    /// Language translation requests are translated into
    #[serde(default = "default_language")]
    pub target_language: String,

    /// Attempts per run, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Deadline for a single attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_timeout_secs: Option<u64>,

    /// Word budget the formatter aims for
    #[serde(default = "default_soft_word_limit")]
    pub soft_word_limit: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            target_language: default_language(),
            max_attempts: default_max_attempts(),
            run_timeout_secs: None,
            soft_word_limit: default_soft_word_limit(),
        }
    }
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_max_attempts() -> u32 {
    2
}

fn default_soft_word_limit() -> usize {
    DEFAULT_SOFT_WORD_LIMIT
}

/// `[agents.<kind>]` section
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AgentOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Replaces the default instructions (router and responder)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Tools offered to the responder; defaults to `general` and `dateutils`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolpacks: Option<Vec<Toolpack>>,
}

/// `[localization]` section
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LocalizationConfig {
    /// Language → refusal template containing `{reason}`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub refusals: BTreeMap<String, String>,
    /// Language → generic error text
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error occurred while reading/writing config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// TOML serialization error
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// Well-formed TOML with unusable values
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// Searches for `agentflow.toml` in the current directory, then in
    /// `~/.config/agentflow/`. Returns the defaults if neither exists.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// First existing config file in search order
    pub fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        Self::user_config_path().ok().filter(|p| p.exists())
    }

    /// Save configuration as pretty TOML
    ///
    /// Writes to `path`, or to the user config location when `None`.
    /// Parent directories are created as needed.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let target_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::user_config_path()?,
        };

        if let Some(parent) = target_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&target_path, toml_string)?;
        Ok(target_path)
    }

    /// `~/.config/agentflow/agentflow.toml`
    pub fn user_config_path() -> Result<PathBuf, ConfigError> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine home directory",
            ))
        })?;
        Ok(home_dir
            .join(".config")
            .join("agentflow")
            .join(CONFIG_FILE_NAME))
    }

    /// Apply environment variable overrides
    ///
    /// - `AGENTFLOW_API_KEY`, then `OPENAI_API_KEY` → `endpoint.api_key`
    /// - `AGENTFLOW_BASE_URL` → `endpoint.base_url`
    /// - `AGENTFLOW_MODEL` → `endpoint.model`
    /// - `AGENTFLOW_LANGUAGE` → `workflow.language`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Same as [`Config::apply_env_overrides`] with a custom variable source
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = var("AGENTFLOW_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.endpoint.api_key = Some(api_key);
        }
        if let Some(base_url) = var("AGENTFLOW_BASE_URL") {
            self.endpoint.base_url = base_url;
        }
        if let Some(model) = var("AGENTFLOW_MODEL") {
            self.endpoint.model = model;
        }
        if let Some(language) = var("AGENTFLOW_LANGUAGE") {
            self.workflow.language = language;
        }
    }

    /// Check values the TOML schema cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("endpoint: {:#}", e)))?;

        for key in self.agents.keys() {
            if parse_kind(key).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "unknown agent '{}' (expected router, responder, translator or formatter)",
                    key
                )));
            }
        }
        if self.workflow.language.trim().is_empty() {
            return Err(ConfigError::Invalid("workflow.language cannot be empty".to_string()));
        }
        if self.workflow.target_language.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "workflow.target_language cannot be empty".to_string(),
            ));
        }
        if self.workflow.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "workflow.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.workflow.run_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "workflow.run_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Construction settings for one capability, overrides applied
    pub fn agent_settings(&self, kind: CapabilityKind) -> AgentSettings {
        let mut llm = self.endpoint.clone();
        let overrides = self.agents.get(kind.key());

        if let Some(o) = overrides {
            if let Some(model) = &o.model {
                llm.model = model.clone();
            }
            if o.temperature.is_some() {
                llm.temperature = o.temperature;
            }
        }

        AgentSettings {
            llm,
            language: self.workflow.language.clone(),
            system_prompt: overrides.and_then(|o| o.system_prompt.clone()),
            soft_word_limit: self.workflow.soft_word_limit,
            toolpacks: overrides
                .and_then(|o| o.toolpacks.clone())
                .unwrap_or_else(Toolpack::defaults),
        }
    }

    /// Registry with the four LLM-backed capabilities registered (not yet initialized)
    pub fn build_registry(&self) -> Result<Registry, WorkflowError> {
        let mut registry = Registry::new();
        for kind in CapabilityKind::ALL {
            registry.register(kind.key(), AgentFactory::new(kind), self.agent_settings(kind))?;
        }
        Ok(registry)
    }

    /// Built-in catalog extended with `[localization]` entries
    pub fn catalog(&self) -> Result<MessageCatalog, WorkflowError> {
        let mut catalog = MessageCatalog::builtin();
        for (language, template) in &self.localization.refusals {
            catalog.insert_refusal(language, template.clone())?;
        }
        for (language, text) in &self.localization.errors {
            catalog.insert_error(language, text.clone());
        }

        if !catalog.has_language(&self.workflow.language) {
            warn!(
                language = %self.workflow.language,
                "no refusal template for the configured language; refusals will fail"
            );
        }
        Ok(catalog)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::default().with_max_attempts(self.workflow.max_attempts);
        match self.workflow.run_timeout_secs {
            Some(secs) => policy.with_timeout(Duration::from_secs(secs)),
            None => policy,
        }
    }

    /// Run parameters from `[workflow]`
    pub fn run_extras(&self) -> RunExtras {
        RunExtras::new()
            .language(self.workflow.language.clone())
            .target_language(self.workflow.target_language.clone())
    }
}

fn parse_kind(key: &str) -> Option<CapabilityKind> {
    CapabilityKind::ALL.into_iter().find(|k| k.key() == key)
}
