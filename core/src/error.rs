//! Error types for agentflow
//!
//! `WorkflowError` is the taxonomy surfaced by the registry and the workflow
//! engine. `CapabilityError` is what capability implementations return; the
//! engine wraps it into `WorkflowError::CapabilityFailure` at the node that
//! made the call.

use std::fmt;
use thiserror::Error;

use crate::capability::CapabilityKind;

/// Why a capability call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityErrorKind {
    /// The call itself failed (transport, provider, setup)
    Call,
    /// The call returned output that failed validation
    MalformedOutput,
    /// The call did not finish before its deadline
    Timeout,
}

/// Error returned by a capability implementation
#[derive(Debug, Clone)]
pub struct CapabilityError {
    pub kind: CapabilityErrorKind,
    pub message: String,
}

impl CapabilityError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            kind: CapabilityErrorKind::Call,
            message: msg.into(),
        }
    }

    pub fn malformed_output(msg: impl Into<String>) -> Self {
        Self {
            kind: CapabilityErrorKind::MalformedOutput,
            message: msg.into(),
        }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self {
            kind: CapabilityErrorKind::Timeout,
            message: msg.into(),
        }
    }
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CapabilityErrorKind::Call => write!(f, "{}", self.message),
            CapabilityErrorKind::MalformedOutput => write!(f, "malformed output: {}", self.message),
            CapabilityErrorKind::Timeout => write!(f, "timed out: {}", self.message),
        }
    }
}

impl std::error::Error for CapabilityError {}

impl From<anyhow::Error> for CapabilityError {
    fn from(e: anyhow::Error) -> Self {
        CapabilityError::new(format!("{:#}", e))
    }
}

/// Primary error type for registry lookups and workflow runs
#[derive(Error, Debug)]
pub enum WorkflowError {
    // =========================================================================
    // Registry Errors
    // =========================================================================
    /// Name was never registered
    #[error("capability not found: {name}")]
    NotFound { name: String },

    /// Name is registered but `initialize()` has not materialized it yet
    #[error("capability '{name}' not initialized. Call initialize() first.")]
    NotInitialized { name: String },

    /// Name is already materialized and cannot be registered again
    #[error("capability '{name}' is already materialized")]
    AlreadyMaterialized { name: String },

    /// Factory configuration rejected at registration time
    #[error("invalid configuration for '{name}': {reason}")]
    InvalidConfig { name: String, reason: String },

    /// Entry exists but holds a different kind of capability or a parameter
    #[error("'{name}' is a {found}, expected a {expected}")]
    KindMismatch {
        name: String,
        expected: String,
        found: String,
    },

    // =========================================================================
    // Composition Errors
    // =========================================================================
    /// A node requirement is absent from the dependency bundle
    #[error("missing dependency: {name}")]
    MissingDependency { name: String },

    // =========================================================================
    // Localization Errors
    // =========================================================================
    /// No template for the requested language
    #[error("no localized template for language '{language}'")]
    MissingLocalization { language: String },

    /// Template does not have exactly one substitution point
    #[error("invalid template for language '{language}': {reason}")]
    InvalidTemplate { language: String, reason: String },

    // =========================================================================
    // Run Errors
    // =========================================================================
    /// An external capability call failed; the run was aborted
    #[error("{capability} failed: {source}")]
    CapabilityFailure {
        capability: String,
        #[source]
        source: CapabilityError,
    },

    /// Router returned a route code outside the defined set
    #[error("protocol violation: unknown route code {route}")]
    ProtocolViolation { route: i64 },
}

impl WorkflowError {
    pub(crate) fn capability(kind: CapabilityKind, source: CapabilityError) -> Self {
        Self::CapabilityFailure {
            capability: kind.to_string(),
            source,
        }
    }

    /// Construction or setup of a registered name failed
    pub(crate) fn construction(name: &str, source: CapabilityError) -> Self {
        Self::CapabilityFailure {
            capability: name.to_string(),
            source,
        }
    }

    /// Check if a caller may reasonably retry the whole run
    ///
    /// Only external call failures are transient. Protocol violations,
    /// missing localizations and registry errors repeat on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CapabilityFailure { .. })
    }
}

pub type Result<T, E = WorkflowError> = std::result::Result<T, E>;
