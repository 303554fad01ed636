//! Registry factory for the LLM-backed capabilities

use serde::{Deserialize, Serialize};

use super::formatter::{LlmFormatter, DEFAULT_SOFT_WORD_LIMIT};
use super::responder::LlmResponder;
use super::router::LlmRouter;
use super::translator::LlmTranslator;
use crate::capability::{CapabilityHandle, CapabilityKind};
use crate::error::CapabilityError;
use crate::llm::{LlmClient, LlmConfig};
use crate::registry::CapabilityFactory;
use crate::tools::{ToolSet, Toolpack};
use crate::workflow::DEFAULT_LANGUAGE;

/// Construction settings shared by every LLM-backed capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub llm: LlmConfig,
    /// Language the responder and formatter answer in
    pub language: String,
    /// Replaces the default instructions (router and responder only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub soft_word_limit: usize,
    /// Tools offered to the model (responder only)
    pub toolpacks: Vec<Toolpack>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            system_prompt: None,
            soft_word_limit: DEFAULT_SOFT_WORD_LIMIT,
            toolpacks: Toolpack::defaults(),
        }
    }
}

impl AgentSettings {
    pub fn new(llm: LlmConfig) -> Self {
        Self {
            llm,
            ..Self::default()
        }
    }
}

/// Builds one kind of LLM-backed capability
#[derive(Debug, Clone, Copy)]
pub struct AgentFactory {
    kind: CapabilityKind,
}

impl AgentFactory {
    pub fn new(kind: CapabilityKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }
}

#[async_trait::async_trait]
impl CapabilityFactory for AgentFactory {
    type Config = AgentSettings;

    fn validate(&self, settings: &AgentSettings) -> Result<(), String> {
        settings.llm.validate().map_err(|e| e.to_string())?;
        if settings.language.trim().is_empty() {
            return Err("language cannot be empty".to_string());
        }
        if self.kind == CapabilityKind::Formatter && settings.soft_word_limit == 0 {
            return Err("soft_word_limit must be greater than zero".to_string());
        }
        Ok(())
    }

    async fn build(&self, settings: &AgentSettings) -> Result<CapabilityHandle, CapabilityError> {
        let client = LlmClient::new(settings.llm.clone())?;
        let prompt = settings.system_prompt.as_deref();

        let handle = match self.kind {
            CapabilityKind::Router => {
                CapabilityHandle::router(LlmRouter::new(client, prompt.map(str::to_string)))
            }
            CapabilityKind::Responder => CapabilityHandle::responder(
                LlmResponder::new(client, &settings.language, prompt)
                    .with_tools(ToolSet::from_packs(&settings.toolpacks)),
            ),
            CapabilityKind::Translator => CapabilityHandle::translator(LlmTranslator::new(client)),
            CapabilityKind::Formatter => CapabilityHandle::formatter(LlmFormatter::new(
                client,
                &settings.language,
                settings.soft_word_limit,
            )),
        };
        Ok(handle)
    }
}
