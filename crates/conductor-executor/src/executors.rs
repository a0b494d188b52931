use conductor_config::{ExecutorKind, NodeDef};
use conductor_node::{NodeInput, NodeOutput};
use conductor_registry::Registry;
use conductor_state::SharedState;
use tokio_util::sync::CancellationToken;

use crate::docker::DockerExecutor;
use crate::error::ExecutorError;
use crate::inline::InlineExecutor;
use crate::process::ProcessExecutor;

/// Facade selecting among the three executor strategies by `node.executor`.
/// All three implement `execute(node, input, env, timeout) ->
/// NodeOutput`; the engine dispatches through this facade rather than
/// matching on `node.executor` itself.
#[derive(Clone)]
pub struct Executors {
  inline: InlineExecutor,
  process: ProcessExecutor,
  docker: DockerExecutor,
}

impl Executors {
  pub fn new(registry: Registry, process_pool_size: usize) -> Self {
    Self {
      inline: InlineExecutor::new(registry),
      process: ProcessExecutor::new(process_pool_size),
      docker: DockerExecutor::new(),
    }
  }

  /// Registry shared with inline/process executors, for dispatch-time
  /// validation in the engine before an invocation is even scheduled.
  pub fn registry(&self) -> &Registry {
    self.inline.registry()
  }

  #[allow(clippy::too_many_arguments)]
  pub async fn execute(
    &self,
    node: &NodeDef,
    input: NodeInput,
    state: &SharedState,
    cancel: CancellationToken,
    timeout_secs: f64,
  ) -> Result<NodeOutput, ExecutorError> {
    match node.executor {
      ExecutorKind::Inline => {
        self
          .inline
          .execute(node, input, state.clone(), cancel, timeout_secs)
          .await
      }
      ExecutorKind::Process => {
        self
          .process
          .execute(node, input, state.clone(), self.registry(), cancel, timeout_secs)
          .await
      }
      ExecutorKind::Docker => self.docker.execute(node, input, cancel, timeout_secs).await,
    }
  }
}
