//! LLM-backed router

use async_trait::async_trait;
use tracing::debug;

use super::prompts::ROUTER_INSTRUCTIONS;
use crate::capability::{Capability, ChatMessage, Router, RoutingResponse};
use crate::error::CapabilityError;
use crate::llm::{LlmClient, ResponseFormat};

/// Classifies messages by asking the model for a JSON routing decision
pub struct LlmRouter {
    client: LlmClient,
    instructions: String,
}

impl LlmRouter {
    /// `instructions` replaces the default routing prompt when given
    pub fn new(client: LlmClient, instructions: Option<String>) -> Self {
        Self {
            client,
            instructions: instructions.unwrap_or_else(|| ROUTER_INSTRUCTIONS.to_string()),
        }
    }
}

#[async_trait]
impl Capability for LlmRouter {
    fn name(&self) -> &str {
        "llm-router"
    }

    async fn setup(&self) -> Result<(), CapabilityError> {
        Ok(self.client.config().check_credentials()?)
    }
}

#[async_trait]
impl Router for LlmRouter {
    async fn route(&self, message: &str) -> Result<RoutingResponse, CapabilityError> {
        let request = self
            .client
            .request(vec![
                ChatMessage::system(self.instructions.clone()),
                ChatMessage::user(message),
            ])
            .with_response_format(ResponseFormat::JsonObject);

        let raw = self.client.complete_request(&request).await?;
        let routing = parse_routing(&raw)?;
        debug!(route = routing.route, reasoning = ?routing.reasoning, "routed message");
        Ok(routing)
    }
}

/// Parse the model's routing JSON, tolerating a markdown code fence
pub(crate) fn parse_routing(raw: &str) -> Result<RoutingResponse, CapabilityError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body).map_err(|e| {
        CapabilityError::malformed_output(format!("routing response is not valid JSON ({}): {}", e, body))
    })
}
