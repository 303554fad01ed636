//! LLM-backed guardrails formatter

use async_trait::async_trait;
use tracing::debug;

use super::prompts::guardrails_instructions;
use crate::capability::{Capability, ChatMessage, Formatter};
use crate::error::CapabilityError;
use crate::llm::LlmClient;

pub const DEFAULT_SOFT_WORD_LIMIT: usize = 250;

/// Rewrites drafts to fit length and content guidelines
pub struct LlmFormatter {
    client: LlmClient,
    instructions: String,
}

impl LlmFormatter {
    pub fn new(client: LlmClient, language: &str, soft_word_limit: usize) -> Self {
        Self {
            client,
            instructions: guardrails_instructions(language, soft_word_limit),
        }
    }
}

#[async_trait]
impl Capability for LlmFormatter {
    fn name(&self) -> &str {
        "llm-formatter"
    }

    async fn setup(&self) -> Result<(), CapabilityError> {
        Ok(self.client.config().check_credentials()?)
    }
}

#[async_trait]
impl Formatter for LlmFormatter {
    async fn reformat(&self, text: &str) -> Result<String, CapabilityError> {
        let formatted = self
            .client
            .complete(vec![
                ChatMessage::system(self.instructions.clone()),
                ChatMessage::user(text),
            ])
            .await?;
        debug!(
            input_words = text.split_whitespace().count(),
            output_words = formatted.split_whitespace().count(),
            "reformatted draft"
        );
        Ok(formatted)
    }
}
