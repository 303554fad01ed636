//! Workflow nodes
//!
//! The six nodes form a closed set; each `step` performs at most one
//! capability call, mutates the run state and says where to go next.

use std::fmt;

use super::deps::WorkflowDeps;
use crate::capability::CapabilityKind;
use crate::error::{CapabilityError, Result, WorkflowError};
use crate::localization::MessageCatalog;
use crate::state::{RunState, TaskType};

/// A node of the workflow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Entry point, carries the input message
    Start { message: String },
    Classify,
    Generate,
    Translate,
    Guardrails,
    /// Carries the router's reasoning, if it gave one
    Refuse { reasoning: Option<String> },
}

/// Data-free tag of a [`Node`], recorded in the visited path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Start,
    Classify,
    Generate,
    Translate,
    Guardrails,
    Refuse,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Start => "start",
            NodeKind::Classify => "classify",
            NodeKind::Generate => "generate",
            NodeKind::Translate => "translate",
            NodeKind::Guardrails => "guardrails",
            NodeKind::Refuse => "refuse",
        };
        f.write_str(name)
    }
}

/// Result of one node step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Next(Node),
    Terminal(String),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Start { .. } => NodeKind::Start,
            Node::Classify => NodeKind::Classify,
            Node::Generate => NodeKind::Generate,
            Node::Translate => NodeKind::Translate,
            Node::Guardrails => NodeKind::Guardrails,
            Node::Refuse { .. } => NodeKind::Refuse,
        }
    }

    /// Execute this node against `state`
    pub(crate) async fn step(
        self,
        state: &mut RunState,
        deps: &WorkflowDeps,
        catalog: &MessageCatalog,
    ) -> Result<Transition> {
        match self {
            Node::Start { message } => {
                state.current_message = message;
                Ok(Transition::Next(Node::Classify))
            }

            Node::Classify => {
                let response = deps
                    .router
                    .route(&state.current_message)
                    .await
                    .map_err(|e| failed(CapabilityKind::Router, e))?;

                let task = TaskType::try_from(response.route)?;
                state.classify(task);
                let next = match task {
                    TaskType::Refuse => Node::Refuse {
                        reasoning: response.reasoning,
                    },
                    TaskType::Translate => Node::Translate,
                    TaskType::Conversation => Node::Generate,
                };
                Ok(Transition::Next(next))
            }

            Node::Generate => {
                debug_assert_eq!(state.task_type(), Some(TaskType::Conversation));
                let generation = deps
                    .responder
                    .generate(&state.current_message, &deps.history)
                    .await
                    .map_err(|e| failed(CapabilityKind::Responder, e))?;

                state.generated_response = generation.text;
                state.updated_history = Some(generation.history);
                Ok(Transition::Next(Node::Guardrails))
            }

            Node::Translate => {
                debug_assert_eq!(state.task_type(), Some(TaskType::Translate));
                let translated = deps
                    .translator
                    .translate(&state.current_message, &deps.target_language)
                    .await
                    .map_err(|e| failed(CapabilityKind::Translator, e))?;

                state.generated_response = translated;
                Ok(Transition::Next(Node::Guardrails))
            }

            Node::Guardrails => {
                let formatted = deps
                    .formatter
                    .reformat(&state.generated_response)
                    .await
                    .map_err(|e| failed(CapabilityKind::Formatter, e))?;
                Ok(Transition::Terminal(formatted))
            }

            Node::Refuse { reasoning } => {
                let info = state.set_refusal(reasoning.as_deref());
                let text = catalog.refusal(&deps.language, &info.reason)?;
                Ok(Transition::Terminal(text))
            }
        }
    }
}

fn failed(kind: CapabilityKind, source: CapabilityError) -> WorkflowError {
    WorkflowError::capability(kind, source)
}
