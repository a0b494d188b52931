use std::process::Stdio;

use conductor_config::NodeDef;
use conductor_node::{NodeInput, NodeOutput};
use serde_json::Value as Json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ExecutorError;

/// Subprocess-isolated executor.
///
/// Runs `docker run --rm -i [--env K=V …] <image>`, writes the
/// `NodeInput` as JSON to stdin then closes it, reads stdout to EOF. Docker
/// nodes never receive the shared-state handle; isolation is the contract.
#[derive(Clone, Default)]
pub struct DockerExecutor;

impl DockerExecutor {
  pub fn new() -> Self {
    Self
  }

  pub async fn execute(
    &self,
    node: &NodeDef,
    input: NodeInput,
    cancel: CancellationToken,
    timeout_secs: f64,
  ) -> Result<NodeOutput, ExecutorError> {
    let mut command = Command::new("docker");
    command.arg("run").arg("--rm").arg("-i");
    for (key, value) in &node.env {
      command.arg("--env").arg(format!("{key}={value}"));
    }
    command.arg(&node.target);
    command
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());

    let mut child = command
      .spawn()
      .map_err(|e| ExecutorError::DockerSpawn(e.to_string()))?;

    let input_bytes = serde_json::to_vec(&input)
      .map_err(|e| ExecutorError::DockerSpawn(format!("failed to serialise input: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
      // A node that never reads stdin (or exits immediately) makes this
      // write fail with a broken pipe; that is a node runtime error, not
      // a dispatch-time one, so it is swallowed here and surfaces via the
      // non-zero exit code / empty stdout path below.
      let _ = stdin.write_all(&input_bytes).await;
      drop(stdin);
    }

    tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        warn!(node_id = %node.id, image = %node.target, "docker node cancelled (timeout), killing container");
        let _ = child.kill().await;
        Ok(NodeOutput::timeout(timeout_secs))
      }
      output = await_output(&mut child) => {
        output
      }
    }
  }
}

async fn await_output(child: &mut tokio::process::Child) -> Result<NodeOutput, ExecutorError> {
  let mut stdout = String::new();
  let mut stderr = String::new();

  if let Some(mut out) = child.stdout.take() {
    let _ = out.read_to_string(&mut stdout).await;
  }
  if let Some(mut err) = child.stderr.take() {
    let _ = err.read_to_string(&mut stderr).await;
  }

  let status = child
    .wait()
    .await
    .map_err(|e| ExecutorError::DockerSpawn(e.to_string()))?;

  if !status.success() {
    let mut metadata = serde_json::Map::new();
    metadata.insert("stdout".to_string(), Json::String(stdout));
    metadata.insert("stderr".to_string(), Json::String(stderr));
    metadata.insert(
      "exit_code".to_string(),
      Json::from(status.code().unwrap_or(-1)),
    );
    return Ok(NodeOutput {
      status: "error".to_string(),
      data: Json::Null,
      metadata: metadata
        .into_iter()
        .collect::<std::collections::BTreeMap<_, _>>(),
    });
  }

  match serde_json::from_str::<Json>(&stdout) {
    Ok(value) => {
      info!("docker node exited 0 with parseable json output");
      Ok(NodeOutput::normalize(value))
    }
    Err(_) => {
      let mut metadata = serde_json::Map::new();
      metadata.insert("stdout".to_string(), Json::String(stdout));
      metadata.insert("stderr".to_string(), Json::String(stderr));
      metadata.insert("error".to_string(), Json::String("invalid json".to_string()));
      Ok(NodeOutput {
        status: "error".to_string(),
        data: Json::Null,
        metadata: metadata
          .into_iter()
          .collect::<std::collections::BTreeMap<_, _>>(),
      })
    }
  }
}
