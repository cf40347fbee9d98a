//! Invokable registry
//!
//! Maps command names to handler descriptors. The registry is filled once
//! while the plugin is constructed and only read afterwards, so it is shared
//! behind an `Arc` without locking.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::core::PluginResult;

use super::binding::{BoundArgs, Param};

/// Synchronous handler, runs to completion inside the dispatch
pub type SyncHandlerFn = Arc<dyn Fn(BoundArgs) -> PluginResult<()> + Send + Sync>;

/// Asynchronous handler, scheduled as its own task
pub type AsyncHandlerFn =
    Arc<dyn Fn(BoundArgs) -> BoxFuture<'static, PluginResult<()>> + Send + Sync>;

/// The callable part of a handler
#[derive(Clone)]
pub enum HandlerFn {
    Sync(SyncHandlerFn),
    Async(AsyncHandlerFn),
}

/// A registered handler: name, declared parameters and callable
#[derive(Clone)]
pub struct HandlerDescriptor {
    name: String,
    params: Vec<Param>,
    handler: HandlerFn,
}

impl HandlerDescriptor {
    /// Create a descriptor
    ///
    /// Repeated parameters are dropped; the first occurrence keeps its
    /// position.
    pub fn new(name: impl Into<String>, params: &[Param], handler: HandlerFn) -> Self {
        let mut declared = Vec::with_capacity(params.len());
        for param in params {
            if !declared.contains(param) {
                declared.push(*param);
            }
        }

        Self {
            name: name.into(),
            params: declared,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters, in order
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Declared parameter names, in order
    pub fn param_names(&self) -> Vec<&'static str> {
        self.params.iter().map(|p| p.name()).collect()
    }

    pub fn is_async(&self) -> bool {
        matches!(self.handler, HandlerFn::Async(_))
    }

    pub fn handler(&self) -> &HandlerFn {
        &self.handler
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("params", &self.param_names())
            .field("is_async", &self.is_async())
            .finish()
    }
}

/// Registry of every command the plugin answers to
#[derive(Default)]
pub struct InvokableRegistry {
    handlers: HashMap<String, HandlerDescriptor>,
}

impl InvokableRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler descriptor
    ///
    /// A second registration under the same name replaces the first; the
    /// replaced descriptor is returned.
    pub fn register(&mut self, descriptor: HandlerDescriptor) -> Option<HandlerDescriptor> {
        let name = descriptor.name().to_string();
        tracing::debug!(
            "[InvokableRegistry] Registering '{}' {:?} (async: {})",
            name,
            descriptor.param_names(),
            descriptor.is_async()
        );

        let previous = self.handlers.insert(name.clone(), descriptor);
        if previous.is_some() {
            tracing::info!("[InvokableRegistry] '{}' re-registered, last one wins", name);
        }
        previous
    }

    /// Register a synchronous handler
    pub fn register_sync<F>(&mut self, name: &str, params: &[Param], handler: F) -> &mut Self
    where
        F: Fn(BoundArgs) -> PluginResult<()> + Send + Sync + 'static,
    {
        self.register(HandlerDescriptor::new(
            name,
            params,
            HandlerFn::Sync(Arc::new(handler)),
        ));
        self
    }

    /// Register an asynchronous handler
    pub fn register_async<F, Fut>(&mut self, name: &str, params: &[Param], handler: F) -> &mut Self
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PluginResult<()>> + Send + 'static,
    {
        let handler: AsyncHandlerFn = Arc::new(move |args| handler(args).boxed());
        self.register(HandlerDescriptor::new(name, params, HandlerFn::Async(handler)));
        self
    }

    /// Register an existing handler under another name
    ///
    /// Returns false if `target` is not registered.
    pub fn alias(&mut self, alias: &str, target: &str) -> bool {
        let Some(existing) = self.handlers.get(target) else {
            return false;
        };
        let descriptor = HandlerDescriptor::new(alias, existing.params(), existing.handler().clone());
        self.register(descriptor);
        true
    }

    /// Look up a handler by command name
    pub fn lookup(&self, name: &str) -> Option<&HandlerDescriptor> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Get the list of registered command names
    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
