use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use conductor_config::{ExecutorKind, NodeDef};
use conductor_executor::Executors;
use conductor_node::{NodeId, NodeInput, NodeOutput};
use conductor_state::SharedState;
use conductor_trace::{TraceEntry, TraceRecorder};
use conductor_workflow::Flow;
use serde_json::Value as Json;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::EngineError;

/// Engine-wide tunables not carried on individual nodes.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
  pub max_concurrency: usize,
  pub default_timeout_secs: f64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      max_concurrency: 4,
      default_timeout_secs: 30.0,
    }
  }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunResult {
  pub terminal_outputs: BTreeMap<NodeId, NodeOutput>,
  pub trace: Vec<TraceEntry>,
  pub shared_state_snapshot: BTreeMap<String, Json>,
}

struct Dispatched {
  node_id: NodeId,
  output: NodeOutput,
  scheduled: Vec<NodeId>,
}

/// The flow scheduling dispatcher.
///
/// Generalises the teacher's wave-barrier loop (run every ready node, wait
/// for the whole wave, repeat) into a single-dispatcher loop that launches
/// one invocation at a time as capacity and pending work allow, so a
/// long-running node on one branch never blocks dispatch of an unrelated
/// branch. `max_concurrency` is the only backpressure the engine applies:
/// the loop only pops from `pending` and launches while fewer than
/// `max_concurrency` invocations are in flight.
#[derive(Clone)]
pub struct FlowEngine {
  executors: Executors,
  config: EngineConfig,
}

impl FlowEngine {
  pub fn new(executors: Executors, config: EngineConfig) -> Self {
    Self { executors, config }
  }

  /// Run `flow` to completion from `seed_payload`. Every id in
  /// `flow.start` is dispatched with the same seed input.
  ///
  /// Returns `Err` only for the one class of configuration error that is
  /// fatal to the whole run: a `target` that does not resolve against the
  /// registry. Any other node-level failure (timeout, docker non-zero exit, a node body
  /// raising) is captured as a `NodeOutput` with `status: "error"` or
  /// `"timeout"` and the run continues — only dispatch preparation aborts
  /// the whole run, never something that happens inside an already-spawned
  /// invocation.
  #[instrument(name = "flow_run", skip(self, flow, seed_payload, state), fields(flow = %flow.name))]
  pub async fn run(
    &self,
    flow: Arc<Flow>,
    seed_payload: Json,
    state: SharedState,
  ) -> Result<RunResult, EngineError> {
    let recorder = TraceRecorder::new();
    let mut pending: VecDeque<(NodeId, NodeInput)> = flow
      .start
      .iter()
      .map(|id| (id.clone(), NodeInput::seed(seed_payload.clone())))
      .collect();
    let mut terminal_outputs: BTreeMap<NodeId, NodeOutput> = BTreeMap::new();
    let mut in_flight: usize = 0;
    let mut joins: JoinSet<Dispatched> = JoinSet::new();

    loop {
      while in_flight < self.config.max_concurrency {
        let Some((node_id, input)) = pending.pop_front() else {
          break;
        };
        let node = flow
          .get_node(&node_id)
          .ok_or_else(|| EngineError::NodeNotFound(node_id.clone()))?
          .clone();

        // Dispatch-preparation check: a missing callable module aborts the
        // whole run, not just this node. Docker targets
        // are image names, not registry keys, and have no equivalent
        // upfront check — a missing image surfaces as a per-node error
        // from inside the docker executor instead.
        if matches!(node.executor, ExecutorKind::Inline | ExecutorKind::Process)
          && !self.executors.registry().contains(&node.target)
        {
          return Err(EngineError::UnresolvedCallable(node_id, node.target));
        }

        let sequence = recorder.next_sequence();
        let executors = self.executors.clone();
        let task_state = state.clone();
        let task_recorder = recorder.clone();
        let timeout_secs = node.timeout.unwrap_or(self.config.default_timeout_secs);

        joins.spawn(async move {
          dispatch_one(
            executors,
            node,
            input,
            task_state,
            task_recorder,
            sequence,
            timeout_secs,
          )
          .await
        });
        in_flight += 1;
      }

      if in_flight == 0 {
        break;
      }

      let joined = joins
        .join_next()
        .await
        .expect("in_flight > 0 implies a pending join");
      in_flight -= 1;
      let dispatched = joined.map_err(|e| EngineError::DispatchPanicked(e.to_string()))?;

      if dispatched.scheduled.is_empty() {
        terminal_outputs.insert(dispatched.node_id, dispatched.output);
      } else {
        for successor in &dispatched.scheduled {
          let next_input = NodeInput::from_successor(&dispatched.output, &dispatched.node_id);
          pending.push_back((successor.clone(), next_input));
        }
      }
    }

    Ok(RunResult {
      terminal_outputs,
      trace: recorder.snapshot().await,
      shared_state_snapshot: state.snapshot().await,
    })
  }
}

/// Run one invocation to completion and append its trace entry.
///
/// Owns the per-invocation timeout: spawns a timer that cancels a child
/// [`CancellationToken`] after `timeout_secs`, so the executor's own
/// `select!` against that token is what actually stops the work (letting
/// each executor decide what "stop" means — drop a future, kill a
/// container, abandon a worker-pool request).
async fn dispatch_one(
  executors: Executors,
  node: NodeDef,
  input: NodeInput,
  state: SharedState,
  recorder: TraceRecorder,
  sequence: u64,
  timeout_secs: f64,
) -> Dispatched {
  let started_at = Utc::now();
  let cancel = CancellationToken::new();
  let timer_cancel = cancel.clone();
  let timer = tokio::spawn(async move {
    tokio::time::sleep(Duration::from_secs_f64(timeout_secs.max(0.0))).await;
    timer_cancel.cancel();
  });

  let output = match executors
    .execute(&node, input.clone(), &state, cancel, timeout_secs)
    .await
  {
    Ok(output) => output,
    // A dispatch-time error surfacing here (rather than being caught by
    // the upfront registry check) is treated as this node's failure, not
    // a run-wide abort — the invocation was already spawned.
    Err(err) => NodeOutput::error(err.to_string()),
  };
  timer.abort();

  let finished_at = Utc::now();
  let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
  let scheduled = node
    .successors_for(&output.status)
    .map(|s| s.to_vec())
    .unwrap_or_default();
  let error = output
    .metadata
    .get("error")
    .and_then(|v| v.as_str())
    .map(|s| s.to_string());

  let entry = TraceEntry {
    node_id: node.id.clone(),
    sequence,
    started_at,
    finished_at,
    duration_ms,
    input,
    output: output.clone(),
    status: output.status.clone(),
    scheduled: scheduled.clone(),
    error,
  };
  recorder.append(entry).await;

  Dispatched {
    node_id: node.id,
    output,
    scheduled,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use conductor_config::FlowDef;
  use conductor_registry::{Callable, Registry};
  use conductor_workflow::Flow;
  use serde_json::json;
  use std::collections::BTreeMap;

  fn node(id: &str, target: &str, transitions: BTreeMap<String, Vec<NodeId>>) -> NodeDef {
    NodeDef {
      id: id.to_string(),
      executor: ExecutorKind::Inline,
      target: target.to_string(),
      timeout: None,
      env: BTreeMap::new(),
      transitions,
    }
  }

  #[tokio::test]
  async fn runs_a_linear_flow_to_a_terminal_output() {
    let mut registry = Registry::new();
    registry.register(
      "demo:double",
      Callable::blocking(|input, _state| json!(input.payload.as_i64().unwrap_or(0) * 2)),
    );
    let executors = Executors::new(registry, 1);

    let mut nodes = BTreeMap::new();
    nodes.insert("a".to_string(), node("a", "demo:double", BTreeMap::new()));
    let flow = Arc::new(
      Flow::lock(FlowDef {
        name: "f".to_string(),
        start: vec!["a".to_string()],
        nodes,
      })
      .unwrap(),
    );

    let engine = FlowEngine::new(executors, EngineConfig::default());
    let result = engine
      .run(flow, json!(21), SharedState::default())
      .await
      .unwrap();

    assert_eq!(result.terminal_outputs["a"].data, json!(42));
    assert_eq!(result.trace.len(), 1);
  }

  #[tokio::test]
  async fn branches_on_status_and_falls_back_to_default() {
    let mut registry = Registry::new();
    registry.register(
      "demo:even_odd",
      Callable::blocking(|input, _state| {
        let n = input.payload.as_i64().unwrap_or(0);
        json!({"status": if n % 2 == 0 { "even" } else { "odd" }})
      }),
    );
    registry.register("demo:noop", Callable::blocking(|input, _state| input.payload));

    let mut a_transitions = BTreeMap::new();
    a_transitions.insert("even".to_string(), vec!["b".to_string()]);
    a_transitions.insert("default".to_string(), vec!["c".to_string()]);

    let mut nodes = BTreeMap::new();
    nodes.insert("a".to_string(), node("a", "demo:even_odd", a_transitions));
    nodes.insert("b".to_string(), node("b", "demo:noop", BTreeMap::new()));
    nodes.insert("c".to_string(), node("c", "demo:noop", BTreeMap::new()));

    let flow = Arc::new(
      Flow::lock(FlowDef {
        name: "f".to_string(),
        start: vec!["a".to_string()],
        nodes,
      })
      .unwrap(),
    );
    let engine = FlowEngine::new(Executors::new(registry, 1), EngineConfig::default());

    let result = engine
      .run(flow.clone(), json!(3), SharedState::default())
      .await
      .unwrap();
    assert!(result.terminal_outputs.contains_key("c"));
    assert!(!result.terminal_outputs.contains_key("b"));

    let result = engine
      .run(flow, json!(4), SharedState::default())
      .await
      .unwrap();
    assert!(result.terminal_outputs.contains_key("b"));
  }

  #[tokio::test]
  async fn unresolved_target_aborts_the_run() {
    let registry = Registry::new();
    let executors = Executors::new(registry, 1);

    let mut nodes = BTreeMap::new();
    nodes.insert("a".to_string(), node("a", "missing:target", BTreeMap::new()));
    let flow = Arc::new(
      Flow::lock(FlowDef {
        name: "f".to_string(),
        start: vec!["a".to_string()],
        nodes,
      })
      .unwrap(),
    );

    let engine = FlowEngine::new(executors, EngineConfig::default());
    let err = engine
      .run(flow, json!(null), SharedState::default())
      .await
      .unwrap_err();
    assert!(matches!(err, EngineError::UnresolvedCallable(_, _)));
  }

  #[tokio::test]
  async fn fan_out_schedules_every_successor() {
    let mut registry = Registry::new();
    registry.register("demo:split", Callable::blocking(|input, _state| input.payload));
    registry.register("demo:leaf", Callable::blocking(|input, _state| input.payload));

    let mut transitions = BTreeMap::new();
    transitions.insert(
      "default".to_string(),
      vec!["b".to_string(), "c".to_string()],
    );
    let mut nodes = BTreeMap::new();
    nodes.insert("a".to_string(), node("a", "demo:split", transitions));
    nodes.insert("b".to_string(), node("b", "demo:leaf", BTreeMap::new()));
    nodes.insert("c".to_string(), node("c", "demo:leaf", BTreeMap::new()));

    let flow = Arc::new(
      Flow::lock(FlowDef {
        name: "f".to_string(),
        start: vec!["a".to_string()],
        nodes,
      })
      .unwrap(),
    );
    let engine = FlowEngine::new(Executors::new(registry, 2), EngineConfig::default());
    let result = engine
      .run(flow, json!(1), SharedState::default())
      .await
      .unwrap();

    assert_eq!(result.terminal_outputs.len(), 2);
    assert!(result.terminal_outputs.contains_key("b"));
    assert!(result.terminal_outputs.contains_key("c"));
    assert_eq!(result.trace.len(), 3);
  }

  #[tokio::test]
  async fn node_timeout_yields_timeout_status_and_does_not_abort_run() {
    let mut registry = Registry::new();
    registry.register(
      "demo:sleep",
      Callable::r#async(|_input, _state| async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        json!(null)
      }),
    );
    let mut node_def = node("a", "demo:sleep", BTreeMap::new());
    node_def.timeout = Some(0.05);
    let mut nodes = BTreeMap::new();
    nodes.insert("a".to_string(), node_def);

    let flow = Arc::new(
      Flow::lock(FlowDef {
        name: "f".to_string(),
        start: vec!["a".to_string()],
        nodes,
      })
      .unwrap(),
    );
    let engine = FlowEngine::new(Executors::new(registry, 1), EngineConfig::default());
    let result = engine
      .run(flow, json!(null), SharedState::default())
      .await
      .unwrap();

    assert_eq!(result.terminal_outputs["a"].status, "timeout");
  }
}
