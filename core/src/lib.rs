pub mod agents;
pub mod bundle;
pub mod capability;
pub mod config;
pub mod error;
pub mod llm;
pub mod localization;
pub mod registry;
pub mod state;
pub mod tools;
pub mod util;
pub mod workflow;

// Re-exports for convenience
pub use bundle::{DependencyBundle, RunExtras};
pub use capability::{CapabilityHandle, CapabilityKind, ChatMessage};
pub use config::Config;
pub use error::{CapabilityError, WorkflowError};
pub use localization::MessageCatalog;
pub use registry::Registry;
pub use state::{RunState, TaskType};
pub use workflow::{RetryPolicy, RunReport, Workflow};
