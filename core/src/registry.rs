//! Capability registry
//!
//! Name-keyed store that defers construction of capabilities until
//! [`Registry::initialize`], then hands out shared instances and per-run
//! dependency bundles.
//!
//! Mutation (`register*`, `initialize`, `clear`) takes `&mut self`, so it is
//! serialized by the borrow checker; once startup is done the registry is
//! typically wrapped in an `Arc` and only read.
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry
//!     .register("router", AgentFactory::new(AgentKind::Router), settings.clone())?
//!     .register("formatter", AgentFactory::new(AgentKind::Formatter), settings)?;
//! registry.initialize().await?;
//! let router = registry.router("router")?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::bundle::{Dependency, DependencyBundle, RunExtras};
use crate::capability::{
    CapabilityHandle, CapabilityKind, Formatter, Responder, Router, Translator,
};
use crate::error::{CapabilityError, Result, WorkflowError};

/// Deferred constructor for one capability
///
/// `validate` runs when the factory is registered; `build` runs during
/// `initialize`.
#[async_trait::async_trait]
pub trait CapabilityFactory: Send + Sync + 'static {
    type Config: Send + Sync + 'static;

    /// Reject a configuration before anything is constructed
    fn validate(&self, _config: &Self::Config) -> std::result::Result<(), String> {
        Ok(())
    }

    async fn build(&self, config: &Self::Config) -> std::result::Result<CapabilityHandle, CapabilityError>;
}

/// Factory from a plain constructor closure
pub struct FnFactory<F>(F);

impl<F> FnFactory<F>
where
    F: Fn() -> CapabilityHandle + Send + Sync + 'static,
{
    pub fn new(constructor: F) -> Self {
        Self(constructor)
    }
}

#[async_trait::async_trait]
impl<F> CapabilityFactory for FnFactory<F>
where
    F: Fn() -> CapabilityHandle + Send + Sync + 'static,
{
    type Config = ();

    async fn build(&self, _config: &()) -> std::result::Result<CapabilityHandle, CapabilityError> {
        Ok((self.0)())
    }
}

/// A factory paired with its validated configuration
#[async_trait::async_trait]
trait Recipe: Send + Sync {
    async fn construct(&self) -> std::result::Result<CapabilityHandle, CapabilityError>;
}

struct FactoryRecipe<F: CapabilityFactory> {
    factory: F,
    config: F::Config,
}

#[async_trait::async_trait]
impl<F: CapabilityFactory> Recipe for FactoryRecipe<F> {
    async fn construct(&self) -> std::result::Result<CapabilityHandle, CapabilityError> {
        self.factory.build(&self.config).await
    }
}

/// Registry of pending factories and materialized capabilities
#[derive(Default)]
pub struct Registry {
    /// Every registered name, in first-registration order
    order: Vec<String>,
    pending: HashMap<String, Box<dyn Recipe>>,
    materialized: HashMap<String, CapabilityHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a construction recipe for `name`
    ///
    /// Replaces an earlier pending recipe for the same name (keeping its
    /// position in registration order). Fails if `name` is already
    /// materialized or `factory` rejects `config`.
    pub fn register<F: CapabilityFactory>(
        &mut self,
        name: impl Into<String>,
        factory: F,
        config: F::Config,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.materialized.contains_key(&name) {
            return Err(WorkflowError::AlreadyMaterialized { name });
        }
        if let Err(reason) = factory.validate(&config) {
            return Err(WorkflowError::InvalidConfig { name, reason });
        }

        let replaced = self
            .pending
            .insert(name.clone(), Box::new(FactoryRecipe { factory, config }))
            .is_some();
        if !replaced {
            self.order.push(name.clone());
        }
        debug!(name = %name, replaced, "registered capability factory");
        Ok(self)
    }

    /// Insert an already-built capability, bypassing construction
    ///
    /// A pending recipe for the same name is discarded.
    pub fn register_instance(
        &mut self,
        name: impl Into<String>,
        instance: CapabilityHandle,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.materialized.contains_key(&name) {
            return Err(WorkflowError::AlreadyMaterialized { name });
        }
        if self.pending.remove(&name).is_none() {
            self.order.push(name.clone());
        }
        debug!(name = %name, kind = %instance.kind(), "registered capability instance");
        self.materialized.insert(name, instance);
        Ok(self)
    }

    /// Construct every pending name, in registration order
    ///
    /// Each constructed capability gets its `setup` hook awaited before it
    /// is stored. Names already materialized are never rebuilt, so calling
    /// this again is a no-op. On failure the failing name stays pending and
    /// everything built before it stays materialized.
    pub async fn initialize(&mut self) -> Result<()> {
        let todo: Vec<String> = self
            .order
            .iter()
            .filter(|name| self.pending.contains_key(*name) && !self.materialized.contains_key(*name))
            .cloned()
            .collect();

        for name in todo {
            let handle = match self.pending.get(&name) {
                Some(recipe) => recipe
                    .construct()
                    .await
                    .map_err(|e| WorkflowError::construction(&name, e))?,
                None => continue,
            };
            handle
                .setup()
                .await
                .map_err(|e| WorkflowError::construction(&name, e))?;

            info!(name = %name, kind = %handle.kind(), capability = handle.name(), "materialized capability");
            self.pending.remove(&name);
            self.materialized.insert(name, handle);
        }
        Ok(())
    }

    /// Get a materialized capability
    pub fn get(&self, name: &str) -> Result<CapabilityHandle> {
        if let Some(handle) = self.materialized.get(name) {
            return Ok(handle.clone());
        }
        if self.pending.contains_key(name) {
            return Err(WorkflowError::NotInitialized {
                name: name.to_string(),
            });
        }
        Err(WorkflowError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn router(&self, name: &str) -> Result<Arc<dyn Router>> {
        match self.get(name)? {
            CapabilityHandle::Router(router) => Ok(router),
            other => Err(mismatch(name, CapabilityKind::Router, &other)),
        }
    }

    pub fn responder(&self, name: &str) -> Result<Arc<dyn Responder>> {
        match self.get(name)? {
            CapabilityHandle::Responder(responder) => Ok(responder),
            other => Err(mismatch(name, CapabilityKind::Responder, &other)),
        }
    }

    pub fn translator(&self, name: &str) -> Result<Arc<dyn Translator>> {
        match self.get(name)? {
            CapabilityHandle::Translator(translator) => Ok(translator),
            other => Err(mismatch(name, CapabilityKind::Translator, &other)),
        }
    }

    pub fn formatter(&self, name: &str) -> Result<Arc<dyn Formatter>> {
        match self.get(name)? {
            CapabilityHandle::Formatter(formatter) => Ok(formatter),
            other => Err(mismatch(name, CapabilityKind::Formatter, &other)),
        }
    }

    /// True if `name` is registered, pending or materialized
    pub fn has(&self, name: &str) -> bool {
        self.materialized.contains_key(name) || self.pending.contains_key(name)
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.materialized.contains_key(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Materialized instances merged with `extras`; extras win on collision
    pub fn to_dependency_bundle(&self, extras: RunExtras) -> DependencyBundle {
        let instances = self
            .materialized
            .iter()
            .map(|(name, handle)| (name.clone(), Dependency::Capability(handle.clone())));
        DependencyBundle::merge(instances, extras)
    }

    /// Drop every pending and materialized entry
    pub fn clear(&mut self) {
        self.order.clear();
        self.pending.clear();
        self.materialized.clear();
    }
}

fn mismatch(name: &str, expected: CapabilityKind, found: &CapabilityHandle) -> WorkflowError {
    WorkflowError::KindMismatch {
        name: name.to_string(),
        expected: format!("{} capability", expected),
        found: format!("{} capability", found.kind()),
    }
}
