//! Dependency bundle
//!
//! Per-run, read-only view of materialized capabilities merged with run
//! parameters. Run parameters override capabilities on name collision.

use std::collections::HashMap;

use crate::capability::{CapabilityHandle, ChatMessage};

/// Well-known bundle keys
pub mod keys {
    pub const ROUTER: &str = "router";
    pub const RESPONDER: &str = "responder";
    pub const TRANSLATOR: &str = "translator";
    pub const FORMATTER: &str = "formatter";

    /// Language of refusal messages
    pub const LANGUAGE: &str = "language";
    pub const TARGET_LANGUAGE: &str = "target_language";
    pub const CHAT_HISTORY: &str = "chat_history";
}

/// One bundle entry
#[derive(Debug, Clone)]
pub enum Dependency {
    Capability(CapabilityHandle),
    Text(String),
    History(Vec<ChatMessage>),
}

impl Dependency {
    /// Short description for error messages
    pub fn describe(&self) -> String {
        match self {
            Dependency::Capability(handle) => format!("{} capability", handle.kind()),
            Dependency::Text(_) => "text parameter".to_string(),
            Dependency::History(_) => "history parameter".to_string(),
        }
    }
}

impl From<CapabilityHandle> for Dependency {
    fn from(handle: CapabilityHandle) -> Self {
        Dependency::Capability(handle)
    }
}

/// Extra per-run parameters layered over the registry's instances
#[derive(Debug, Clone, Default)]
pub struct RunExtras {
    entries: Vec<(String, Dependency)>,
}

impl RunExtras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, dependency: impl Into<Dependency>) -> Self {
        self.entries.push((name.into(), dependency.into()));
        self
    }

    pub fn language(self, language: impl Into<String>) -> Self {
        self.with(keys::LANGUAGE, Dependency::Text(language.into()))
    }

    pub fn target_language(self, language: impl Into<String>) -> Self {
        self.with(keys::TARGET_LANGUAGE, Dependency::Text(language.into()))
    }

    pub fn chat_history(self, history: Vec<ChatMessage>) -> Self {
        self.with(keys::CHAT_HISTORY, Dependency::History(history))
    }

    /// Override a registry instance for this run only
    pub fn capability(self, name: impl Into<String>, handle: CapabilityHandle) -> Self {
        self.with(name, Dependency::Capability(handle))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for RunExtras {
    type Item = (String, Dependency);
    type IntoIter = std::vec::IntoIter<(String, Dependency)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Name-keyed dependencies for one run
#[derive(Debug, Clone, Default)]
pub struct DependencyBundle {
    entries: HashMap<String, Dependency>,
}

impl DependencyBundle {
    /// Merge `base` with `extras`; extras win on collision
    pub fn merge(
        base: impl IntoIterator<Item = (String, Dependency)>,
        extras: RunExtras,
    ) -> Self {
        let mut entries: HashMap<String, Dependency> = base.into_iter().collect();
        entries.extend(extras);
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.entries.get(name)
    }

    pub fn capability(&self, name: &str) -> Option<&CapabilityHandle> {
        match self.entries.get(name) {
            Some(Dependency::Capability(handle)) => Some(handle),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.entries.get(name) {
            Some(Dependency::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn history(&self, name: &str) -> Option<&[ChatMessage]> {
        match self.entries.get(name) {
            Some(Dependency::History(history)) => Some(history),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
