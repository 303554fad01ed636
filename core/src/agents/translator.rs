//! LLM-backed translator

use async_trait::async_trait;

use super::prompts::translator_instructions;
use crate::capability::{Capability, ChatMessage, Translator};
use crate::error::CapabilityError;
use crate::llm::LlmClient;

pub struct LlmTranslator {
    client: LlmClient,
}

impl LlmTranslator {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Capability for LlmTranslator {
    fn name(&self) -> &str {
        "llm-translator"
    }

    async fn setup(&self) -> Result<(), CapabilityError> {
        Ok(self.client.config().check_credentials()?)
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, message: &str, target_language: &str) -> Result<String, CapabilityError> {
        let text = self
            .client
            .complete(vec![
                ChatMessage::system(translator_instructions(target_language)),
                ChatMessage::user(message),
            ])
            .await?;
        Ok(text.trim().to_string())
    }
}
