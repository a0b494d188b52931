use std::collections::BTreeMap;
use std::sync::Arc;

use conductor_config::NodeDef;
use conductor_node::{NodeInput, NodeOutput};
use conductor_registry::{Callable, Registry};
use conductor_state::SharedState;
use serde_json::Value as Json;
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::env_overlay::EnvOverlayGuard;
use crate::error::ExecutorError;

/// One unit of work handed to a pool worker.
struct WorkerRequest {
  target: String,
  input: NodeInput,
  state: SharedState,
  registry: Registry,
  env: BTreeMap<String, String>,
  cancel: CancellationToken,
  reply: oneshot::Sender<Json>,
}

/// Fixed-size worker pool executor.
///
/// Implemented as `process_pool_size` long-lived worker tasks fed by a
/// single FIFO request channel, each request carrying `(target,
/// serialised_input, env_overlay)` and each reply carrying a serialised
/// `NodeOutput`. Shared-state access is direct `Arc`-backed access through
/// the same `SharedState` mutex rather than a separate IPC round-trip,
/// since workers here are in-process tasks rather than separate OS
/// processes (see DESIGN.md).
///
/// Workers are in-process tasks sharing the one process environment, so a
/// request's env overlay is applied and restored under a pool-wide mutex —
/// the same serialisation `InlineExecutor` uses against its own env
/// mutation — rather than being silently dropped.
///
/// A request whose token is cancelled mid-flight gets a prompt
/// timeout reply from its worker, which then moves on to the next queued
/// request without waiting for the abandoned work to finish.
#[derive(Clone)]
pub struct ProcessExecutor {
  sender: mpsc::Sender<WorkerRequest>,
  // Keeps the workers and the shared receiver alive for the pool's
  // lifetime; dropping the executor drops the sender, which then drains
  // and stops every worker loop.
  _workers: Arc<Vec<tokio::task::JoinHandle<()>>>,
}

impl ProcessExecutor {
  pub fn new(pool_size: usize) -> Self {
    let pool_size = pool_size.max(1);
    let (sender, receiver) = mpsc::channel(256);
    let receiver = Arc::new(AsyncMutex::new(receiver));
    let env_mutex = Arc::new(AsyncMutex::new(()));

    let workers = (0..pool_size)
      .map(|id| {
        let receiver = receiver.clone();
        let env_mutex = env_mutex.clone();
        tokio::spawn(async move { worker_loop(id, receiver, env_mutex).await })
      })
      .collect();

    Self {
      sender,
      _workers: Arc::new(workers),
    }
  }

  pub async fn execute(
    &self,
    node: &NodeDef,
    input: NodeInput,
    state: SharedState,
    registry: &Registry,
    cancel: CancellationToken,
    timeout_secs: f64,
  ) -> Result<NodeOutput, ExecutorError> {
    registry
      .resolve(&node.target)
      .map_err(|e| ExecutorError::UnresolvedCallable(e.0))?;

    let (reply_tx, reply_rx) = oneshot::channel();
    let request = WorkerRequest {
      target: node.target.clone(),
      input,
      state,
      registry: registry.clone(),
      env: node.env.clone(),
      cancel,
      reply: reply_tx,
    };

    self
      .sender
      .send(request)
      .await
      .map_err(|_| ExecutorError::PoolShutDown)?;

    match reply_rx.await {
      Ok(raw) => Ok(NodeOutput::normalize(raw)),
      Err(_) => Ok(NodeOutput::timeout(timeout_secs)),
    }
  }
}

async fn worker_loop(
  id: usize,
  receiver: Arc<AsyncMutex<mpsc::Receiver<WorkerRequest>>>,
  env_mutex: Arc<AsyncMutex<()>>,
) {
  loop {
    let request = {
      let mut receiver = receiver.lock().await;
      receiver.recv().await
    };

    let Some(request) = request else {
      info!(worker = id, "process pool worker shutting down");
      return;
    };

    let env_lock = env_mutex.lock().await;
    let overlay = EnvOverlayGuard::apply(&request.env);

    let outcome = tokio::select! {
      biased;
      _ = request.cancel.cancelled() => None,
      output = run_request(&request) => Some(output),
    };

    // Restore the overlay before handing the reply back so the caller
    // never observes it still applied.
    drop(overlay);
    drop(env_lock);

    match outcome {
      None => {
        warn!(worker = id, target = %request.target, "worker request cancelled, replacing worker for next request");
        // reply channel dropped -> execute() sees a RecvError and returns
        // a timeout NodeOutput; the abandoned future is dropped here,
        // ending its polling even though any spawn_blocking thread it
        // started keeps running to completion in the background.
      }
      Some(output) => {
        let _ = request.reply.send(output);
      }
    }
  }
}

async fn run_request(request: &WorkerRequest) -> Json {
  match request.registry.resolve(&request.target) {
    Ok(Callable::Async(f)) => f(request.input.clone(), request.state.clone()).await,
    Ok(Callable::Blocking(f)) => {
      let input = request.input.clone();
      let state = request.state.clone();
      tokio::task::spawn_blocking(move || f(input, state))
        .await
        .unwrap_or_else(|e| {
          serde_json::json!({"status": "error", "metadata": {"error": e.to_string()}})
        })
    }
    Err(e) => serde_json::json!({"status": "error", "metadata": {"error": e.to_string()}}),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use conductor_config::ExecutorKind;
  use serde_json::json;
  use std::collections::BTreeMap;
  use std::time::Duration;

  fn node(target: &str) -> NodeDef {
    NodeDef {
      id: "n".to_string(),
      executor: ExecutorKind::Process,
      target: target.to_string(),
      timeout: None,
      env: BTreeMap::new(),
      transitions: BTreeMap::new(),
    }
  }

  #[tokio::test]
  async fn runs_work_on_pool() {
    let mut registry = Registry::new();
    registry.register(
      "demo:double",
      Callable::blocking(|input, _state| json!(input.payload.as_i64().unwrap_or(0) * 2)),
    );
    let pool = ProcessExecutor::new(2);
    let out = pool
      .execute(
        &node("demo:double"),
        NodeInput::seed(json!(21)),
        SharedState::default(),
        &registry,
        CancellationToken::new(),
        5.0,
      )
      .await
      .unwrap();
    assert_eq!(out.data, json!(42));
  }

  #[tokio::test]
  async fn node_env_is_visible_to_the_callable() {
    let mut registry = Registry::new();
    registry.register(
      "demo:read_env",
      Callable::blocking(|_input, _state| {
        json!(std::env::var("CONDUCTOR_PROCESS_TEST_VAR").unwrap_or_default())
      }),
    );
    let mut target_node = node("demo:read_env");
    target_node
      .env
      .insert("CONDUCTOR_PROCESS_TEST_VAR".to_string(), "present".to_string());

    let pool = ProcessExecutor::new(1);
    let out = pool
      .execute(
        &target_node,
        NodeInput::seed(json!(null)),
        SharedState::default(),
        &registry,
        CancellationToken::new(),
        5.0,
      )
      .await
      .unwrap();
    assert_eq!(out.data, json!("present"));
    assert!(std::env::var("CONDUCTOR_PROCESS_TEST_VAR").is_err());
  }

  #[tokio::test]
  async fn pool_is_fifo_bounded_by_size() {
    let mut registry = Registry::new();
    registry.register(
      "demo:slow",
      Callable::r#async(|input, _state| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        input.payload
      }),
    );
    let pool = ProcessExecutor::new(1);
    let started = std::time::Instant::now();
    let a = pool.execute(
      &node("demo:slow"),
      NodeInput::seed(json!(1)),
      SharedState::default(),
      &registry,
      CancellationToken::new(),
      5.0,
    );
    let b = pool.execute(
      &node("demo:slow"),
      NodeInput::seed(json!(2)),
      SharedState::default(),
      &registry,
      CancellationToken::new(),
      5.0,
    );
    let (a, b) = tokio::join!(a, b);
    assert!(a.is_ok() && b.is_ok());
    assert!(started.elapsed() >= Duration::from_millis(90));
  }

  #[tokio::test]
  async fn cancellation_yields_timeout() {
    let mut registry = Registry::new();
    registry.register(
      "demo:sleep",
      Callable::r#async(|_input, _state| async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        json!(null)
      }),
    );
    let pool = ProcessExecutor::new(1);
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(10)).await;
      cancel_clone.cancel();
    });
    let out = pool
      .execute(
        &node("demo:sleep"),
        NodeInput::seed(json!(null)),
        SharedState::default(),
        &registry,
        cancel,
        0.1,
      )
      .await
      .unwrap();
    assert_eq!(out.status, "timeout");
  }
}
