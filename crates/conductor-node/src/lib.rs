//! Node invocation envelope for Conductor.
//!
//! This crate holds the two small data types that flow between the engine
//! and a node's executor — [`NodeInput`] and [`NodeOutput`] — along with the
//! normalisation rule that turns an arbitrary JSON value returned by a node
//! body into a well-formed [`NodeOutput`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Identifier of a node within a flow. Plain `String` alias, matching the
/// spec's `NodeId` — nodes are looked up by this key in
/// `FlowDefinition::nodes`.
pub type NodeId = String;

/// Default status assigned to a [`NodeOutput`] that a node body returns
/// without specifying one.
pub const DEFAULT_STATUS: &str = "success";

/// What a node receives when the engine dispatches an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
  /// The prior node's `data`, or the caller-provided seed for start nodes.
  pub payload: Json,
  /// Engine-attached context. At minimum carries the originating node id
  /// for non-start invocations (key `"from"`).
  #[serde(default)]
  pub metadata: BTreeMap<String, Json>,
  /// The id of the predecessor that scheduled this invocation, or `None`
  /// for start nodes.
  #[serde(default)]
  pub source: Option<NodeId>,
}

impl NodeInput {
  /// Build the seed input for a `flow.start` node.
  pub fn seed(payload: Json) -> Self {
    Self {
      payload,
      metadata: BTreeMap::new(),
      source: None,
    }
  }

  /// Build the input fed to a successor scheduled from a finished node's
  /// output: `payload: out.data`, `metadata: {...out.metadata, "from":
  /// finished_id}`, `source: finished_id`.
  pub fn from_successor(out: &NodeOutput, finished_id: &str) -> Self {
    let mut metadata = out.metadata.clone();
    metadata.insert("from".to_string(), Json::String(finished_id.to_string()));
    Self {
      payload: out.data.clone(),
      metadata,
      source: Some(finished_id.to_string()),
    }
  }
}

/// What a node produces. `status` selects the transition; `data` becomes
/// the next node's `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
  #[serde(default = "default_status")]
  pub status: String,
  #[serde(default)]
  pub data: Json,
  #[serde(default)]
  pub metadata: BTreeMap<String, Json>,
}

fn default_status() -> String {
  DEFAULT_STATUS.to_string()
}

impl NodeOutput {
  /// Construct a success output with no metadata.
  pub fn success(data: Json) -> Self {
    Self {
      status: DEFAULT_STATUS.to_string(),
      data,
      metadata: BTreeMap::new(),
    }
  }

  /// Construct an error output.
  pub fn error(message: impl Into<String>) -> Self {
    let mut metadata = BTreeMap::new();
    metadata.insert("error".to_string(), Json::String(message.into()));
    Self {
      status: "error".to_string(),
      data: Json::Null,
      metadata,
    }
  }

  /// Construct a timeout output.
  pub fn timeout(timeout_secs: f64) -> Self {
    let mut metadata = BTreeMap::new();
    metadata.insert(
      "error".to_string(),
      Json::String(format!("timeout after {timeout_secs}s")),
    );
    Self {
      status: "timeout".to_string(),
      data: Json::Null,
      metadata,
    }
  }

  /// Normalise an arbitrary JSON value returned by a node body into a
  /// [`NodeOutput`]:
  ///
  /// - A JSON object containing at least one of `status`/`data`/`metadata`
  ///   is a partial `NodeOutput`; missing fields are defaulted.
  /// - Any other value becomes `{status: "success", data: value, metadata: {}}`.
  ///
  /// Satisfies the normalisation law: `normalize(normalize(v).into()) ==
  /// normalize(v)` for any `v`, because a fully-populated `NodeOutput`
  /// serialises back to an object carrying all three recognised keys.
  pub fn normalize(value: Json) -> Self {
    if let Json::Object(map) = &value
      && (map.contains_key("status") || map.contains_key("data") || map.contains_key("metadata"))
    {
      let status = map
        .get("status")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| DEFAULT_STATUS.to_string());
      let data = map.get("data").cloned().unwrap_or(Json::Null);
      let metadata = map
        .get("metadata")
        .and_then(|v| v.as_object())
        .map(|m| {
          m.iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();
      return Self {
        status,
        data,
        metadata,
      };
    }

    Self::success(value)
  }

  /// Serialise this output back into a plain JSON value, for feeding
  /// through [`NodeOutput::normalize`] again or into a trace preview.
  pub fn to_json(&self) -> Json {
    serde_json::to_value(self).expect("NodeOutput always serialises")
  }
}
