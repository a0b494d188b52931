//! Conductor Registry
//!
//! The original system resolves a node's `target = "module:function"`
//! string via the host language's dynamic module lookup. A systems-language
//! port instead registers callables against a string key in a registry
//! populated at start-up. The `target` string in `NodeDefinition` becomes
//! a registry key.
//!
//! A callable is registered as either [`Callable::Async`] (awaited on the
//! dispatcher, for coroutine-like work) or [`Callable::Blocking`] (run via
//! `spawn_blocking`, for synchronous work) — this crate makes that split
//! static at registration time rather than detected dynamically, since Rust
//! has no runtime "is this a coroutine" check.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use conductor_node::NodeInput;
use conductor_state::SharedState;
use serde_json::Value as Json;

/// A boxed, owned future yielding the loose JSON value a node body
/// returns — normalised into a `NodeOutput` by the executor.
pub type BoxFuture = Pin<Box<dyn Future<Output = Json> + Send>>;

/// A registered node implementation.
#[derive(Clone)]
pub enum Callable {
  /// Awaited directly on the dispatcher.
  Async(Arc<dyn Fn(NodeInput, SharedState) -> BoxFuture + Send + Sync>),
  /// Invoked synchronously, off the dispatcher thread via
  /// `spawn_blocking`.
  Blocking(Arc<dyn Fn(NodeInput, SharedState) -> Json + Send + Sync>),
}

impl Callable {
  /// Register an async callable.
  pub fn r#async<F, Fut>(f: F) -> Self
  where
    F: Fn(NodeInput, SharedState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Json> + Send + 'static,
  {
    Callable::Async(Arc::new(move |input, state| Box::pin(f(input, state))))
  }

  /// Register a blocking (synchronous) callable.
  pub fn blocking<F>(f: F) -> Self
  where
    F: Fn(NodeInput, SharedState) -> Json + Send + Sync + 'static,
  {
    Callable::Blocking(Arc::new(f))
  }
}

/// Error raised when a flow references a `target` the registry has no
/// entry for — fatal at dispatch-preparation time.
#[derive(Debug, thiserror::Error)]
#[error("unresolvable callable: {0}")]
pub struct UnresolvedCallable(pub String);

/// Registry of callables keyed by `target` string, populated at engine
/// start-up from configured code locations. Shared across inline and
/// process executors.
#[derive(Clone, Default)]
pub struct Registry {
  entries: HashMap<String, Callable>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a callable under `target`. A later registration with the
  /// same key overwrites the earlier one.
  pub fn register(&mut self, target: impl Into<String>, callable: Callable) {
    self.entries.insert(target.into(), callable);
  }

  /// Resolve a `target` string to its registered callable.
  pub fn resolve(&self, target: &str) -> Result<Callable, UnresolvedCallable> {
    self
      .entries
      .get(target)
      .cloned()
      .ok_or_else(|| UnresolvedCallable(target.to_string()))
  }

  pub fn contains(&self, target: &str) -> bool {
    self.entries.contains_key(target)
  }
}
