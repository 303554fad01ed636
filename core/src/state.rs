//! Run state
//!
//! One `RunState` per workflow run. Created by the engine, mutated only by
//! the node currently executing, handed back to the caller in the run report.

use std::fmt;

use uuid::Uuid;

use crate::capability::ChatMessage;
use crate::error::WorkflowError;

/// Reason substituted when the router refuses without explaining why
pub const UNKNOWN_REASON: &str = "Unknown reason";

/// Task classification for routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Conversation,
    Refuse,
    Translate,
}

impl TaskType {
    /// Route code used on the wire by routers
    pub fn code(&self) -> i64 {
        match self {
            TaskType::Conversation => 1,
            TaskType::Refuse => 2,
            TaskType::Translate => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(TaskType::Conversation),
            2 => Some(TaskType::Refuse),
            3 => Some(TaskType::Translate),
            _ => None,
        }
    }
}

impl TryFrom<i64> for TaskType {
    type Error = WorkflowError;

    fn try_from(route: i64) -> Result<Self, Self::Error> {
        TaskType::from_code(route).ok_or(WorkflowError::ProtocolViolation { route })
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Conversation => write!(f, "conversation"),
            TaskType::Refuse => write!(f, "refuse"),
            TaskType::Translate => write!(f, "translate"),
        }
    }
}

/// Why a request was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefusalInfo {
    pub reason: String,
}

/// Identifier of one run, carried on its tracing span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable record scoped to one workflow execution
///
/// Task classification and refusal info are write-once and only reachable
/// through [`RunState::classify`] and [`RunState::set_refusal`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunState {
    /// The user message being processed
    pub current_message: String,
    /// Response from Generate or Translate; empty until one of them runs
    pub generated_response: String,
    /// Conversation history returned by the responder, if Generate ran
    pub updated_history: Option<Vec<ChatMessage>>,
    task_type: Option<TaskType>,
    refusal_info: Option<RefusalInfo>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_type(&self) -> Option<TaskType> {
        self.task_type
    }

    pub fn refusal_info(&self) -> Option<&RefusalInfo> {
        self.refusal_info.as_ref()
    }

    /// Record the classification. Called once per run, by Classify.
    pub fn classify(&mut self, task: TaskType) {
        debug_assert!(
            self.task_type.is_none(),
            "task classification set twice ({:?} then {:?})",
            self.task_type,
            task
        );
        self.task_type = Some(task);
    }

    /// Record why the request was refused
    ///
    /// The reason is kept exactly as the router gave it. Absent or empty
    /// reasons become [`UNKNOWN_REASON`].
    pub fn set_refusal(&mut self, reason: Option<&str>) -> &RefusalInfo {
        debug_assert_eq!(self.task_type, Some(TaskType::Refuse));
        let reason = match reason {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => UNKNOWN_REASON.to_string(),
        };
        self.refusal_info.insert(RefusalInfo { reason })
    }
}
