use std::collections::BTreeMap;

use conductor_node::NodeId;
use conductor_trace::TraceEntry;

/// Per-node aggregate over a trace — the data both the renderer's
/// `include_metadata` labels and [`crate::summary`] are built from.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStats {
  pub runs: usize,
  pub statuses: BTreeMap<String, usize>,
  pub total_duration_ms: u64,
  pub last_status: String,
  pub last_duration_ms: u64,
  pub last_input_preview: String,
  pub last_output_preview: String,
}

impl NodeStats {
  pub fn avg_duration_ms(&self) -> f64 {
    if self.runs == 0 {
      0.0
    } else {
      self.total_duration_ms as f64 / self.runs as f64
    }
  }

  fn empty() -> Self {
    Self {
      runs: 0,
      statuses: BTreeMap::new(),
      total_duration_ms: 0,
      last_status: String::new(),
      last_duration_ms: 0,
      last_input_preview: String::new(),
      last_output_preview: String::new(),
    }
  }
}

/// Aggregate trace entries per node id, in trace (completion) order —
/// `last_status`, `last_duration_ms`, and the preview fields reflect the
/// most recently *completed* invocation of that node.
pub fn collect(trace: &[TraceEntry]) -> BTreeMap<NodeId, NodeStats> {
  let mut stats: BTreeMap<NodeId, NodeStats> = BTreeMap::new();
  for entry in trace {
    let node_stats = stats
      .entry(entry.node_id.clone())
      .or_insert_with(NodeStats::empty);
    node_stats.runs += 1;
    *node_stats
      .statuses
      .entry(entry.status.clone())
      .or_insert(0) += 1;
    node_stats.total_duration_ms += entry.duration_ms;
    node_stats.last_status = entry.status.clone();
    node_stats.last_duration_ms = entry.duration_ms;
    node_stats.last_input_preview = entry.input_preview();
    node_stats.last_output_preview = entry.output_preview();
  }
  stats
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use conductor_node::{NodeInput, NodeOutput};
  use serde_json::json;

  fn entry(node_id: &str, status: &str, duration_ms: u64) -> TraceEntry {
    let now = Utc::now();
    TraceEntry {
      node_id: node_id.to_string(),
      sequence: 0,
      started_at: now,
      finished_at: now,
      duration_ms,
      input: NodeInput::seed(json!(null)),
      output: NodeOutput::success(json!(null)),
      status: status.to_string(),
      scheduled: vec![],
      error: None,
    }
  }

  #[test]
  fn aggregates_runs_and_statuses_across_entries() {
    let trace = vec![
      entry("a", "success", 10),
      entry("a", "error", 20),
      entry("b", "success", 5),
    ];
    let stats = collect(&trace);
    let a = &stats["a"];
    assert_eq!(a.runs, 2);
    assert_eq!(a.statuses["success"], 1);
    assert_eq!(a.statuses["error"], 1);
    assert_eq!(a.total_duration_ms, 30);
    assert_eq!(a.last_status, "error");
    assert_eq!(a.avg_duration_ms(), 15.0);

    let b = &stats["b"];
    assert_eq!(b.runs, 1);
  }

  #[test]
  fn empty_trace_yields_empty_stats() {
    assert!(collect(&[]).is_empty());
  }
}
