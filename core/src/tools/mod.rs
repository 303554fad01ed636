//! Local tools the responder may call
//!
//! Tools are grouped into [`Toolpack`]s and offered to the model through the
//! chat-completions `tools` field. Failures are returned to the model as
//! text, never raised to the workflow.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::ChatTool;

pub mod dateutils;

/// A function the model can call
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name exposed to the model (e.g. "get_today_date")
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    /// Execute with the decoded arguments object
    async fn call(&self, args: &serde_json::Value) -> Result<String>;
}

/// Named group of tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolpack {
    /// General-purpose tools (currently none)
    General,
    /// Date helpers: today, current week, weekday of a date
    DateUtils,
}

impl Toolpack {
    /// Packs enabled for the general assistant
    pub fn defaults() -> Vec<Toolpack> {
        vec![Toolpack::General, Toolpack::DateUtils]
    }

    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        match self {
            Toolpack::General => Vec::new(),
            Toolpack::DateUtils => dateutils::tools(),
        }
    }
}

/// Tools available to one capability, keyed by name
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tool of `packs`; later packs win on a name clash
    pub fn from_packs(packs: &[Toolpack]) -> Self {
        let mut set = Self::new();
        for pack in packs {
            for tool in pack.tools() {
                set.register(tool);
            }
        }
        set
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        let name = tool.name().to_string();
        debug!(tool = %name, "registered tool");
        self.tools.insert(name, tool);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Definitions for the request's `tools` field
    pub fn definitions(&self) -> Vec<ChatTool> {
        self.tools
            .values()
            .map(|tool| ChatTool::function(tool.name(), tool.description(), tool.parameters()))
            .collect()
    }

    /// Run one call with the model's JSON-encoded arguments
    ///
    /// The error string is meant to be shown to the model.
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String, String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| format!("Unknown tool: {}", name))?;

        let result = async {
            let args = parse_arguments(arguments)?;
            tool.call(&args).await
        }
        .await;

        match result {
            Ok(output) => {
                debug!(tool = %name, "tool call succeeded");
                Ok(output)
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "tool call failed");
                Err(format!("{:#}", e))
            }
        }
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.names())
            .finish()
    }
}

/// Models send "" or "{}" for argument-less calls
fn parse_arguments(arguments: &str) -> Result<serde_json::Value> {
    if arguments.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(arguments).context("Tool arguments are not valid JSON")
}
