//! LLM-backed responder

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::debug;

use super::prompts::responder_instructions;
use crate::capability::{Capability, ChatMessage, Generation, MessageRole, Responder};
use crate::error::CapabilityError;
use crate::llm::client::completion_text;
use crate::llm::LlmClient;
use crate::tools::ToolSet;

/// Tool-call rounds allowed before the model must answer
pub const MAX_TOOL_ROUNDS: usize = 4;

/// General assistant answering in a fixed language
pub struct LlmResponder {
    client: LlmClient,
    instructions: String,
    tools: ToolSet,
}

impl LlmResponder {
    pub fn new(client: LlmClient, language: &str, system_prompt: Option<&str>) -> Self {
        Self {
            client,
            instructions: responder_instructions(system_prompt, language),
            tools: ToolSet::new(),
        }
    }

    /// Offer `tools` to the model on every request
    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Complete `messages`, running requested tool calls until the model answers
    async fn answer(&self, mut messages: Vec<ChatMessage>) -> Result<String> {
        let definitions = self.tools.definitions();
        if definitions.is_empty() {
            return self.client.complete(messages).await;
        }

        for round in 0..=MAX_TOOL_ROUNDS {
            let request = self.client.request(messages.clone()).with_tools(definitions.clone());
            let response = self.client.chat(&request).await?;
            let calls = response.tool_calls().to_vec();
            if calls.is_empty() {
                return completion_text(&response);
            }
            if round == MAX_TOOL_ROUNDS {
                break;
            }

            debug!(round, calls = calls.len(), "model requested tools");
            messages.push(ChatMessage::assistant_tool_calls(
                response.content().unwrap_or_default(),
                calls.clone(),
            ));
            for call in calls {
                let output = match self.tools.execute(&call.function.name, &call.function.arguments).await {
                    Ok(output) => output,
                    Err(e) => format!("Error: {}", e),
                };
                messages.push(ChatMessage::tool(call.id, output));
            }
        }
        bail!("Model still requested tools after {} rounds", MAX_TOOL_ROUNDS)
    }

    /// System prompt, prior turns, then the new user message
    fn messages(&self, message: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.instructions.clone()));
        // a caller-supplied system turn would override ours; tool exchanges
        // belong to the request that made them
        messages.extend(
            history
                .iter()
                .filter(|m| {
                    m.role != MessageRole::System
                        && m.role != MessageRole::Tool
                        && m.tool_calls.is_none()
                })
                .cloned(),
        );
        messages.push(ChatMessage::user(message));
        messages
    }
}

#[async_trait]
impl Capability for LlmResponder {
    fn name(&self) -> &str {
        "llm-responder"
    }

    async fn setup(&self) -> Result<(), CapabilityError> {
        Ok(self.client.config().check_credentials()?)
    }
}

#[async_trait]
impl Responder for LlmResponder {
    async fn generate(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<Generation, CapabilityError> {
        let text = self.answer(self.messages(message, history)).await?;

        let mut updated = history.to_vec();
        updated.push(ChatMessage::user(message));
        updated.push(ChatMessage::assistant(text.clone()));
        Ok(Generation {
            text,
            history: updated,
        })
    }
}
