use std::collections::BTreeMap;

use conductor_node::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// The reserved transition key used as a fallback when no explicit status
/// matches.
pub const DEFAULT_TRANSITION: &str = "default";

/// Which strategy executes a node's `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
  Inline,
  Process,
  Docker,
}

/// A single node in a [`crate::FlowDef`].
///
/// `target` is a callable reference (`module:function` registry key) for
/// inline/process executors, or an image name for docker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub id: NodeId,
  pub executor: ExecutorKind,
  pub target: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout: Option<f64>,
  #[serde(default)]
  pub env: BTreeMap<String, String>,
  #[serde(default)]
  pub transitions: BTreeMap<String, Vec<NodeId>>,
}

impl NodeDef {
  /// Resolve the successor list for a finished status, falling back to
  /// `"default"`. Returns `None` when the node is terminal for this
  /// status (no explicit match and no default).
  pub fn successors_for(&self, status: &str) -> Option<&[NodeId]> {
    self
      .transitions
      .get(status)
      .or_else(|| self.transitions.get(DEFAULT_TRANSITION))
      .map(|v| v.as_slice())
  }
}

/// Loose, pre-normalisation node input/output carried as raw JSON when
/// reading a node's data straight off a config/trace file (used by the
/// loader and by trace deserialisation before parsing into typed
/// `conductor_node` structures).
pub type RawJson = Json;
