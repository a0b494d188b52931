//! Process-wide shared key/value state.
//!
//! [`SharedState`] exposes `get`/`set`/`delete`/`snapshot`, each available
//! in an async flavour (for cooperative-task code, i.e. the dispatcher loop
//! and async inline/process node bodies) and a blocking flavour (for
//! synchronous code executing inside a node body run via
//! `spawn_blocking` — see `conductor-executor`). All mutations are
//! serialised through one mutex; `snapshot` returns an immutable deep copy.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as Json;
use tokio::sync::Mutex;

/// Process-wide mutable key/value store, shared by reference across inline
/// and process executors. Docker executors never receive a handle — their
/// isolation is the contract.
#[derive(Debug, Clone)]
pub struct SharedState {
  inner: Arc<Mutex<BTreeMap<String, Json>>>,
}

impl SharedState {
  /// Create state seeded from `global.shared_state`.
  pub fn new(initial: BTreeMap<String, Json>) -> Self {
    Self {
      inner: Arc::new(Mutex::new(initial)),
    }
  }

  /// Async read: returns `default` when `key` is absent.
  pub async fn get(&self, key: &str, default: Json) -> Json {
    let map = self.inner.lock().await;
    map.get(key).cloned().unwrap_or(default)
  }

  /// Async write.
  pub async fn set(&self, key: impl Into<String>, value: Json) {
    let mut map = self.inner.lock().await;
    map.insert(key.into(), value);
  }

  /// Async delete; no-op if absent.
  pub async fn delete(&self, key: &str) {
    let mut map = self.inner.lock().await;
    map.remove(key);
  }

  /// Async deep-copy snapshot, suitable for trace inclusion or printing.
  pub async fn snapshot(&self) -> BTreeMap<String, Json> {
    let map = self.inner.lock().await;
    map.clone()
  }

  /// Atomic read-modify-write under a single lock acquisition: reads the
  /// current value (or `default` if absent), applies `f`, stores and
  /// returns the result. `get`+`set` alone cannot express this without a
  /// race between the two lock acquisitions; node bodies that need to
  /// accumulate into shared state (e.g. a counter) should use this instead
  /// of a manual get-then-set pair.
  pub async fn update(
    &self,
    key: impl Into<String>,
    default: Json,
    f: impl FnOnce(Json) -> Json,
  ) -> Json {
    let mut map = self.inner.lock().await;
    let key = key.into();
    let current = map.get(&key).cloned().unwrap_or(default);
    let next = f(current);
    map.insert(key, next.clone());
    next
  }

  /// Blocking read, for synchronous node bodies. Must not be called from
  /// within an async task running on the current thread — callers run
  /// synchronous node bodies via `spawn_blocking`, which satisfies this.
  pub fn get_blocking(&self, key: &str, default: Json) -> Json {
    let map = self.inner.blocking_lock();
    map.get(key).cloned().unwrap_or(default)
  }

  pub fn set_blocking(&self, key: impl Into<String>, value: Json) {
    let mut map = self.inner.blocking_lock();
    map.insert(key.into(), value);
  }

  pub fn delete_blocking(&self, key: &str) {
    let mut map = self.inner.blocking_lock();
    map.remove(key);
  }

  pub fn snapshot_blocking(&self) -> BTreeMap<String, Json> {
    let map = self.inner.blocking_lock();
    map.clone()
  }
}

impl Default for SharedState {
  fn default() -> Self {
    Self::new(BTreeMap::new())
  }
}
