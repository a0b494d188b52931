use std::sync::Arc;

use conductor_config::NodeDef;
use conductor_node::{NodeInput, NodeOutput};
use conductor_registry::{Callable, Registry};
use conductor_state::SharedState;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::ExecutorError;
use crate::env_overlay::EnvOverlayGuard;

/// Same-execution-context executor.
///
/// Resolves `node.target` against the registry, applies the node's env
/// overlay under a dedicated mutex (serialised against other inline nodes
/// in the same flow), then awaits the callable if it is async or runs it
/// on a blocking thread otherwise.
#[derive(Clone)]
pub struct InlineExecutor {
  registry: Registry,
  env_mutex: Arc<AsyncMutex<()>>,
}

impl InlineExecutor {
  pub fn new(registry: Registry) -> Self {
    Self {
      registry,
      env_mutex: Arc::new(AsyncMutex::new(())),
    }
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  #[instrument(name = "inline_execute", skip(self, input, state, cancel), fields(node_id = %node.id, target = %node.target))]
  pub async fn execute(
    &self,
    node: &NodeDef,
    input: NodeInput,
    state: SharedState,
    cancel: CancellationToken,
    timeout_secs: f64,
  ) -> Result<NodeOutput, ExecutorError> {
    let callable = self
      .registry
      .resolve(&node.target)
      .map_err(|e| ExecutorError::UnresolvedCallable(e.0))?;

    // Serialise env-overlay mutation against concurrent inline nodes in
    // this flow.
    let _env_lock = self.env_mutex.lock().await;
    let _overlay = EnvOverlayGuard::apply(&node.env);

    let raw = match callable {
      Callable::Async(f) => {
        tokio::select! {
          biased;
          _ = cancel.cancelled() => {
            info!("inline node cancelled (timeout)");
            return Ok(NodeOutput::timeout(timeout_secs));
          }
          result = f(input, state) => result,
        }
      }
      Callable::Blocking(f) => {
        let handle = tokio::task::spawn_blocking(move || f(input, state));
        tokio::select! {
          biased;
          _ = cancel.cancelled() => {
            info!("inline node cancelled (timeout); blocking work left to finish in background");
            return Ok(NodeOutput::timeout(timeout_secs));
          }
          joined = handle => {
            joined.unwrap_or_else(|e| serde_json::json!({"status": "error", "metadata": {"error": e.to_string()}}))
          }
        }
      }
    };

    Ok(NodeOutput::normalize(raw))
  }
}
