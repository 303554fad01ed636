//! Workflow graph
//!
//! ```text
//! Start -> Classify -+-> Generate  -+-> Guardrails -> Terminal
//!                    +-> Translate -+
//!                    +-> Refuse ----------------------> Terminal
//! ```
//!
//! Exactly one of Generate/Translate/Refuse runs per run, so the graph is
//! acyclic and every run visits at most four nodes.

pub mod deps;
pub mod engine;
pub mod node;
pub mod retry;

#[cfg(test)]
mod tests;

pub use deps::{WorkflowDeps, DEFAULT_LANGUAGE};
pub use engine::{RunReport, Workflow};
pub use node::{Node, NodeKind, Transition};
pub use retry::RetryPolicy;
