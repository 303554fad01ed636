//! Capability traits
//!
//! Narrow async contracts for the four remote-backed capabilities the
//! workflow calls out to. No sequencing logic lives here.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;
pub use crate::llm::chat::{ChatMessage, MessageRole};

#[cfg(test)]
pub mod stub;

/// Base capability trait for identity and one-time setup
#[async_trait::async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;

    /// Called once by `Registry::initialize` after construction
    async fn setup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

/// Classification produced by a [`Router`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingResponse {
    /// Route code (1 = conversation, 2 = refuse, 3 = translate)
    pub route: i64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl RoutingResponse {
    pub fn new(route: i64, reasoning: impl Into<String>) -> Self {
        Self {
            route,
            reasoning: Some(reasoning.into()),
        }
    }

    pub fn without_reasoning(route: i64) -> Self {
        Self {
            route,
            reasoning: None,
        }
    }
}

/// Output of a [`Responder`]
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    /// Prior history plus this exchange
    pub history: Vec<ChatMessage>,
}

/// Router capability - message classification
#[async_trait::async_trait]
pub trait Router: Capability {
    async fn route(&self, message: &str) -> Result<RoutingResponse, CapabilityError>;
}

/// Responder capability - conversational generation
#[async_trait::async_trait]
pub trait Responder: Capability {
    async fn generate(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<Generation, CapabilityError>;
}

/// Translator capability
#[async_trait::async_trait]
pub trait Translator: Capability {
    async fn translate(&self, message: &str, target_language: &str) -> Result<String, CapabilityError>;
}

/// Formatter capability - output guardrails
#[async_trait::async_trait]
pub trait Formatter: Capability {
    async fn reformat(&self, text: &str) -> Result<String, CapabilityError>;
}

/// The four capability kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Router,
    Responder,
    Translator,
    Formatter,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 4] = [
        CapabilityKind::Router,
        CapabilityKind::Responder,
        CapabilityKind::Translator,
        CapabilityKind::Formatter,
    ];

    /// Key the workflow looks this capability up by
    pub fn key(&self) -> &'static str {
        match self {
            CapabilityKind::Router => "router",
            CapabilityKind::Responder => "responder",
            CapabilityKind::Translator => "translator",
            CapabilityKind::Formatter => "formatter",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Shared handle to one materialized capability
#[derive(Clone)]
pub enum CapabilityHandle {
    Router(Arc<dyn Router>),
    Responder(Arc<dyn Responder>),
    Translator(Arc<dyn Translator>),
    Formatter(Arc<dyn Formatter>),
}

impl CapabilityHandle {
    pub fn router(r: impl Router + 'static) -> Self {
        Self::Router(Arc::new(r))
    }

    pub fn responder(r: impl Responder + 'static) -> Self {
        Self::Responder(Arc::new(r))
    }

    pub fn translator(t: impl Translator + 'static) -> Self {
        Self::Translator(Arc::new(t))
    }

    pub fn formatter(f: impl Formatter + 'static) -> Self {
        Self::Formatter(Arc::new(f))
    }

    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Router(_) => CapabilityKind::Router,
            Self::Responder(_) => CapabilityKind::Responder,
            Self::Translator(_) => CapabilityKind::Translator,
            Self::Formatter(_) => CapabilityKind::Formatter,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Router(c) => c.name(),
            Self::Responder(c) => c.name(),
            Self::Translator(c) => c.name(),
            Self::Formatter(c) => c.name(),
        }
    }

    pub async fn setup(&self) -> Result<(), CapabilityError> {
        match self {
            Self::Router(c) => c.setup().await,
            Self::Responder(c) => c.setup().await,
            Self::Translator(c) => c.setup().await,
            Self::Formatter(c) => c.setup().await,
        }
    }

    /// True if both handles point at the same instance
    pub fn ptr_eq(&self, other: &CapabilityHandle) -> bool {
        match (self, other) {
            (Self::Router(a), Self::Router(b)) => Arc::ptr_eq(a, b),
            (Self::Responder(a), Self::Responder(b)) => Arc::ptr_eq(a, b),
            (Self::Translator(a), Self::Translator(b)) => Arc::ptr_eq(a, b),
            (Self::Formatter(a), Self::Formatter(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for CapabilityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityHandle")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}
