use std::collections::BTreeSet;

use conductor_trace::TraceEntry;
use conductor_workflow::Flow;

use crate::stats::{NodeStats, collect};

/// Escape label text for inclusion inside a Mermaid node/edge label —
/// quotes, backslashes, and newlines would otherwise break the generated
/// syntax.
fn escape_label(s: &str) -> String {
  s.replace('\\', "&#92;")
    .replace('"', "&quot;")
    .replace('\n', "<br/>")
}

fn node_label(node_id: &str, stats: Option<&NodeStats>, include_metadata: bool) -> String {
  let mut label = escape_label(node_id);
  let Some(stats) = stats.filter(|_| include_metadata) else {
    return label;
  };
  label.push_str("<br/>runs: ");
  label.push_str(&stats.runs.to_string());
  label.push_str("<br/>last: ");
  label.push_str(&escape_label(&stats.last_status));
  label.push_str("<br/>dur: ");
  label.push_str(&stats.last_duration_ms.to_string());
  label.push_str("ms<br/>in: ");
  label.push_str(&escape_label(&stats.last_input_preview));
  label.push_str("<br/>out: ");
  label.push_str(&escape_label(&stats.last_output_preview));
  label
}

/// Render `flow` and its execution `trace` as a Mermaid `flowchart TD`
/// document. Pure: the same `(flow, trace, include_metadata)` always
/// produces byte-identical output, since every collection walked here
/// (`flow.nodes`, the executed-node/edge sets) is a `BTreeMap`/`BTreeSet`.
pub fn render(flow: &Flow, trace: &[TraceEntry], include_metadata: bool) -> String {
  let stats = collect(trace);
  let executed_nodes: BTreeSet<&str> = trace.iter().map(|e| e.node_id.as_str()).collect();
  let executed_edges: BTreeSet<(&str, &str)> = trace
    .iter()
    .flat_map(|e| {
      e.scheduled
        .iter()
        .map(move |to| (e.node_id.as_str(), to.as_str()))
    })
    .collect();

  let mut out = String::from("flowchart TD\n");

  for node_id in flow.nodes.keys() {
    out.push_str("  ");
    out.push_str(node_id);
    out.push_str("[\"");
    out.push_str(&node_label(node_id, stats.get(node_id.as_str()), include_metadata));
    out.push_str("\"]\n");
  }

  let edges: Vec<(&str, &str, &str)> = flow.edges().collect();
  for (from, status, to) in &edges {
    out.push_str("  ");
    out.push_str(from);
    out.push_str(" -->|");
    out.push_str(&escape_label(status));
    out.push_str("| ");
    out.push_str(to);
    out.push('\n');
  }

  if !executed_nodes.is_empty() {
    out.push_str("  classDef executed fill:#cfc;\n");
    out.push_str("  class ");
    let names: Vec<&str> = executed_nodes.iter().copied().collect();
    out.push_str(&names.join(","));
    out.push_str(" executed;\n");
  }

  for (index, (from, _status, to)) in edges.iter().enumerate() {
    if executed_edges.contains(&(*from, *to)) {
      out.push_str("  linkStyle ");
      out.push_str(&index.to_string());
      out.push_str(" stroke:#0a0,stroke-width:2px;\n");
    }
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use conductor_config::{ExecutorKind, FlowDef, NodeDef};
  use conductor_node::{NodeInput, NodeOutput};
  use conductor_workflow::Flow;
  use serde_json::json;
  use std::collections::BTreeMap;

  fn node(id: &str, transitions: BTreeMap<String, Vec<String>>) -> NodeDef {
    NodeDef {
      id: id.to_string(),
      executor: ExecutorKind::Inline,
      target: format!("demo:{id}"),
      timeout: None,
      env: BTreeMap::new(),
      transitions,
    }
  }

  fn sample_flow() -> Flow {
    let mut a_transitions = BTreeMap::new();
    a_transitions.insert("success".to_string(), vec!["b".to_string()]);
    a_transitions.insert("default".to_string(), vec!["c".to_string()]);
    let mut nodes = BTreeMap::new();
    nodes.insert("a".to_string(), node("a", a_transitions));
    nodes.insert("b".to_string(), node("b", BTreeMap::new()));
    nodes.insert("c".to_string(), node("c", BTreeMap::new()));
    Flow::lock(FlowDef {
      name: "demo".to_string(),
      start: vec!["a".to_string()],
      nodes,
    })
    .unwrap()
  }

  fn sample_entry(node_id: &str, status: &str, scheduled: Vec<String>) -> TraceEntry {
    let now = Utc::now();
    TraceEntry {
      node_id: node_id.to_string(),
      sequence: 0,
      started_at: now,
      finished_at: now,
      duration_ms: 12,
      input: NodeInput::seed(json!(null)),
      output: NodeOutput::success(json!(null)),
      status: status.to_string(),
      scheduled,
      error: None,
    }
  }

  #[test]
  fn renders_flowchart_header_and_all_nodes() {
    let flow = sample_flow();
    let out = render(&flow, &[], false);
    assert!(out.starts_with("flowchart TD\n"));
    assert!(out.contains("a[\"a\"]"));
    assert!(out.contains("b[\"b\"]"));
    assert!(out.contains("c[\"c\"]"));
  }

  #[test]
  fn renders_one_edge_per_transition_with_status_label() {
    let flow = sample_flow();
    let out = render(&flow, &[], false);
    assert!(out.contains("a -->|success| b"));
    assert!(out.contains("a -->|default| c"));
  }

  #[test]
  fn executed_nodes_get_the_executed_class() {
    let flow = sample_flow();
    let trace = vec![sample_entry("a", "success", vec!["b".to_string()])];
    let out = render(&flow, &trace, false);
    assert!(out.contains("classDef executed fill:#cfc;"));
    assert!(out.contains("class a executed;"));
    assert!(!out.contains("class a,b"));
  }

  #[test]
  fn no_executed_class_block_when_trace_is_empty() {
    let flow = sample_flow();
    let out = render(&flow, &[], false);
    assert!(!out.contains("classDef"));
  }

  #[test]
  fn executed_edge_gets_a_link_style_at_its_index() {
    let flow = sample_flow();
    let trace = vec![sample_entry("a", "success", vec!["b".to_string()])];
    let out = render(&flow, &trace, false);
    // edges() walks nodes in BTreeMap order: a->b (success) is index 0.
    assert!(out.contains("linkStyle 0 stroke:#0a0,stroke-width:2px;"));
    assert!(!out.contains("linkStyle 1"));
  }

  #[test]
  fn include_metadata_embeds_run_stats_in_the_label() {
    let flow = sample_flow();
    let trace = vec![sample_entry("a", "success", vec!["b".to_string()])];
    let out = render(&flow, &trace, true);
    assert!(out.contains("runs: 1"));
    assert!(out.contains("last: success"));
    assert!(out.contains("dur: 12ms"));
  }

  #[test]
  fn labels_escape_quotes_backslashes_and_newlines() {
    assert_eq!(escape_label("a\"b\\c\nd"), "a&quot;b&#92;c<br/>d");
  }

  #[test]
  fn rendering_is_idempotent() {
    let flow = sample_flow();
    let trace = vec![
      sample_entry("a", "success", vec!["b".to_string()]),
      sample_entry("b", "success", vec![]),
    ];
    assert_eq!(render(&flow, &trace, true), render(&flow, &trace, true));
  }
}
