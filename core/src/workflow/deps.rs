//! Checked composition of a run's dependencies
//!
//! Every node requirement is resolved from the bundle before the first node
//! executes, so a missing or mistyped dependency never surfaces mid-run.

use std::fmt;
use std::sync::Arc;

use crate::bundle::{keys, Dependency, DependencyBundle};
use crate::capability::{
    CapabilityHandle, CapabilityKind, ChatMessage, Formatter, Responder, Router, Translator,
};
use crate::error::{Result, WorkflowError};

pub const DEFAULT_LANGUAGE: &str = "english";

/// Everything the six nodes need, resolved and typed
#[derive(Clone)]
pub struct WorkflowDeps {
    pub router: Arc<dyn Router>,
    pub responder: Arc<dyn Responder>,
    pub translator: Arc<dyn Translator>,
    pub formatter: Arc<dyn Formatter>,
    /// Language of refusal messages
    pub language: String,
    pub target_language: String,
    /// Prior conversation handed to the responder
    pub history: Vec<ChatMessage>,
}

impl WorkflowDeps {
    pub fn new(
        router: Arc<dyn Router>,
        responder: Arc<dyn Responder>,
        translator: Arc<dyn Translator>,
        formatter: Arc<dyn Formatter>,
    ) -> Self {
        Self {
            router,
            responder,
            translator,
            formatter,
            language: DEFAULT_LANGUAGE.to_string(),
            target_language: DEFAULT_LANGUAGE.to_string(),
            history: Vec::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = language.into();
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Resolve the four capabilities and the run parameters from `bundle`
    pub fn from_bundle(bundle: &DependencyBundle) -> Result<Self> {
        let router = match require(bundle, CapabilityKind::Router)? {
            CapabilityHandle::Router(router) => router.clone(),
            other => return Err(wrong_kind(CapabilityKind::Router, other)),
        };
        let responder = match require(bundle, CapabilityKind::Responder)? {
            CapabilityHandle::Responder(responder) => responder.clone(),
            other => return Err(wrong_kind(CapabilityKind::Responder, other)),
        };
        let translator = match require(bundle, CapabilityKind::Translator)? {
            CapabilityHandle::Translator(translator) => translator.clone(),
            other => return Err(wrong_kind(CapabilityKind::Translator, other)),
        };
        let formatter = match require(bundle, CapabilityKind::Formatter)? {
            CapabilityHandle::Formatter(formatter) => formatter.clone(),
            other => return Err(wrong_kind(CapabilityKind::Formatter, other)),
        };

        let language = optional_text(bundle, keys::LANGUAGE)?.unwrap_or(DEFAULT_LANGUAGE);
        let target_language =
            optional_text(bundle, keys::TARGET_LANGUAGE)?.unwrap_or(DEFAULT_LANGUAGE);
        let history = match bundle.get(keys::CHAT_HISTORY) {
            None => Vec::new(),
            Some(Dependency::History(history)) => history.clone(),
            Some(other) => {
                return Err(WorkflowError::KindMismatch {
                    name: keys::CHAT_HISTORY.to_string(),
                    expected: "history parameter".to_string(),
                    found: other.describe(),
                })
            }
        };

        Ok(Self {
            router,
            responder,
            translator,
            formatter,
            language: language.to_string(),
            target_language: target_language.to_string(),
            history,
        })
    }
}

impl fmt::Debug for WorkflowDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowDeps")
            .field("router", &self.router.name())
            .field("responder", &self.responder.name())
            .field("translator", &self.translator.name())
            .field("formatter", &self.formatter.name())
            .field("language", &self.language)
            .field("target_language", &self.target_language)
            .field("history_len", &self.history.len())
            .finish()
    }
}

fn require(bundle: &DependencyBundle, kind: CapabilityKind) -> Result<&CapabilityHandle> {
    match bundle.get(kind.key()) {
        Some(Dependency::Capability(handle)) => Ok(handle),
        Some(other) => Err(WorkflowError::KindMismatch {
            name: kind.key().to_string(),
            expected: format!("{} capability", kind),
            found: other.describe(),
        }),
        None => Err(WorkflowError::MissingDependency {
            name: kind.key().to_string(),
        }),
    }
}

fn wrong_kind(expected: CapabilityKind, found: &CapabilityHandle) -> WorkflowError {
    WorkflowError::KindMismatch {
        name: expected.key().to_string(),
        expected: format!("{} capability", expected),
        found: format!("{} capability", found.kind()),
    }
}

fn optional_text<'a>(bundle: &'a DependencyBundle, name: &str) -> Result<Option<&'a str>> {
    match bundle.get(name) {
        None => Ok(None),
        Some(Dependency::Text(text)) => Ok(Some(text)),
        Some(other) => Err(WorkflowError::KindMismatch {
            name: name.to_string(),
            expected: "text parameter".to_string(),
            found: other.describe(),
        }),
    }
}
