//! Workflow engine
//!
//! Drives one run from `Start` to a terminal result, node by node. The
//! engine performs no retries; see [`super::RetryPolicy`] for an outer wrapper.

use std::sync::Arc;

use tracing::{debug, info_span, warn, Instrument};

use super::deps::WorkflowDeps;
use super::node::{Node, NodeKind, Transition};
use crate::bundle::DependencyBundle;
use crate::error::Result;
use crate::localization::MessageCatalog;
use crate::state::{RunId, RunState};

/// Longest path through the graph (Start, Classify, Generate, Guardrails)
const MAX_PATH_LEN: usize = 4;

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    /// Final text produced by Guardrails or Refuse
    pub output: String,
    /// Nodes visited, in order
    pub path: Vec<NodeKind>,
    pub state: RunState,
}

/// The workflow graph, bound to a localization catalog
///
/// Cheap to clone and safe to share between concurrent runs.
#[derive(Debug, Clone)]
pub struct Workflow {
    catalog: Arc<MessageCatalog>,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new(MessageCatalog::builtin())
    }
}

impl Workflow {
    pub fn new(catalog: MessageCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    /// Run `message` through the graph and return the final text
    pub async fn run(&self, message: &str, bundle: &DependencyBundle) -> Result<String> {
        self.run_traced(message, bundle)
            .await
            .map(|report| report.output)
    }

    /// Like [`Workflow::run`], also returning the visited path and final state
    pub async fn run_traced(&self, message: &str, bundle: &DependencyBundle) -> Result<RunReport> {
        let deps = WorkflowDeps::from_bundle(bundle)?;
        self.run_with_deps(message, &deps).await
    }

    /// Run on dependencies that were already composed
    pub async fn run_with_deps(&self, message: &str, deps: &WorkflowDeps) -> Result<RunReport> {
        let run_id = RunId::new();
        let span = info_span!("workflow_run", run_id = %run_id);

        async move {
            let mut state = RunState::new();
            let mut path = Vec::with_capacity(MAX_PATH_LEN);
            let mut node = Node::Start {
                message: message.to_string(),
            };

            loop {
                let kind = node.kind();
                path.push(kind);
                debug_assert!(path.len() <= MAX_PATH_LEN, "workflow path too long: {:?}", path);

                let transition = match node.step(&mut state, deps, &self.catalog).await {
                    Ok(transition) => transition,
                    Err(e) => {
                        warn!(node = %kind, error = %e, "workflow run aborted");
                        return Err(e);
                    }
                };

                match transition {
                    Transition::Next(next) => {
                        debug!(from = %kind, to = %next.kind(), "transition");
                        node = next;
                    }
                    Transition::Terminal(output) => {
                        debug!(from = %kind, task = ?state.task_type(), "terminal");
                        return Ok(RunReport {
                            run_id,
                            output,
                            path,
                            state,
                        });
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}
