use chrono::{DateTime, Utc};
use conductor_node::{NodeId, NodeInput, NodeOutput};
use serde::{Deserialize, Serialize};

/// Previews are truncated to this many characters for diagram inclusion.
pub const PREVIEW_LIMIT: usize = 200;
const TRUNCATION_MARKER: &str = "…";

/// Truncate `s` to at most `limit` characters, appending a truncation
/// marker when it was cut. Operates on `char` boundaries so multi-byte
/// UTF-8 is never split.
pub fn truncate_preview(s: &str, limit: usize) -> String {
  if s.chars().count() <= limit {
    return s.to_string();
  }
  let truncated: String = s.chars().take(limit).collect();
  format!("{truncated}{TRUNCATION_MARKER}")
}

/// One node invocation record.
///
/// A run produces an ordered sequence of entries; that order is the order
/// of *completion*, not dispatch (the monotonic `sequence` field reflects
/// dispatch order and keeps concurrent completions orderable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
  pub node_id: NodeId,
  pub sequence: u64,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub duration_ms: u64,
  pub input: NodeInput,
  pub output: NodeOutput,
  pub status: String,
  pub scheduled: Vec<NodeId>,
  pub error: Option<String>,
}

impl TraceEntry {
  /// Truncated preview of `input.payload`, for diagram inclusion.
  pub fn input_preview(&self) -> String {
    truncate_preview(&self.input.payload.to_string(), PREVIEW_LIMIT)
  }

  /// Truncated preview of `output.data`, for diagram inclusion.
  pub fn output_preview(&self) -> String {
    truncate_preview(&self.output.data.to_string(), PREVIEW_LIMIT)
  }
}
