//! Stub capabilities
//!
//! Deterministic in-process implementations for the test suites. Each
//! stub records the inputs it was called with.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::{
    Capability, ChatMessage, Formatter, Generation, Responder, Router, RoutingResponse, Translator,
};
use crate::error::CapabilityError;

/// Router returning a fixed classification or a fixed error
pub struct StubRouter {
    result: Result<RoutingResponse, CapabilityError>,
    seen: Mutex<Vec<String>>,
    setup_calls: AtomicUsize,
}

impl StubRouter {
    pub fn fixed(response: RoutingResponse) -> Self {
        Self {
            result: Ok(response),
            seen: Mutex::new(Vec::new()),
            setup_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: CapabilityError) -> Self {
        Self {
            result: Err(err),
            seen: Mutex::new(Vec::new()),
            setup_calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    pub fn setup_calls(&self) -> usize {
        self.setup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Capability for StubRouter {
    fn name(&self) -> &str {
        "stub-router"
    }

    async fn setup(&self) -> Result<(), CapabilityError> {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Router for StubRouter {
    async fn route(&self, message: &str) -> Result<RoutingResponse, CapabilityError> {
        self.seen.lock().push(message.to_string());
        self.result.clone()
    }
}

/// Responder returning a fixed reply, or echoing the message when none is set
pub struct StubResponder {
    reply: Option<String>,
    delay: Duration,
    seen: Mutex<Vec<(String, usize)>>,
}

impl StubResponder {
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self {
            reply: None,
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering, to force interleaving between runs
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Messages seen, each with the length of the history it came with
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.seen.lock().clone()
    }
}

impl Capability for StubResponder {
    fn name(&self) -> &str {
        "stub-responder"
    }
}

#[async_trait::async_trait]
impl Responder for StubResponder {
    async fn generate(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<Generation, CapabilityError> {
        self.seen.lock().push((message.to_string(), history.len()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let text = self.reply.clone().unwrap_or_else(|| message.to_string());

        let mut updated = history.to_vec();
        updated.push(ChatMessage::user(message));
        updated.push(ChatMessage::assistant(text.clone()));
        Ok(Generation { text, history: updated })
    }
}

/// Translator that tags the message with the target language
#[derive(Default)]
pub struct StubTranslator {
    seen: Mutex<Vec<(String, String)>>,
}

impl StubTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.seen.lock().clone()
    }
}

impl Capability for StubTranslator {
    fn name(&self) -> &str {
        "stub-translator"
    }
}

#[async_trait::async_trait]
impl Translator for StubTranslator {
    async fn translate(&self, message: &str, target_language: &str) -> Result<String, CapabilityError> {
        self.seen
            .lock()
            .push((message.to_string(), target_language.to_string()));
        Ok(format!("[{}] {}", target_language, message))
    }
}

#[derive(Clone, Copy)]
enum FormatMode {
    Identity,
    Uppercase,
    Fail,
}

/// Formatter applying a fixed transformation
pub struct StubFormatter {
    mode: FormatMode,
    seen: Mutex<Vec<String>>,
}

impl StubFormatter {
    pub fn identity() -> Self {
        Self::with_mode(FormatMode::Identity)
    }

    pub fn uppercase() -> Self {
        Self::with_mode(FormatMode::Uppercase)
    }

    pub fn failing() -> Self {
        Self::with_mode(FormatMode::Fail)
    }

    fn with_mode(mode: FormatMode) -> Self {
        Self {
            mode,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

impl Capability for StubFormatter {
    fn name(&self) -> &str {
        "stub-formatter"
    }
}

#[async_trait::async_trait]
impl Formatter for StubFormatter {
    async fn reformat(&self, text: &str) -> Result<String, CapabilityError> {
        self.seen.lock().push(text.to_string());
        match self.mode {
            FormatMode::Identity => Ok(text.to_string()),
            FormatMode::Uppercase => Ok(text.to_uppercase()),
            FormatMode::Fail => Err(CapabilityError::new("formatter unavailable")),
        }
    }
}
