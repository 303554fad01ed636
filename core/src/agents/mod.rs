//! LLM-backed capability implementations
//!
//! One chat-completions client per capability; the factory plugs them into
//! the [`crate::registry::Registry`].

pub mod factory;
pub mod formatter;
pub mod prompts;
pub mod responder;
pub mod router;
pub mod translator;

pub use factory::{AgentFactory, AgentSettings};
pub use formatter::LlmFormatter;
pub use responder::LlmResponder;
pub use router::LlmRouter;
pub use translator::LlmTranslator;
