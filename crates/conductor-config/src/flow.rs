use std::collections::BTreeMap;

use conductor_node::NodeId;
use serde::{Deserialize, Serialize};

use crate::node::NodeDef;

/// A flow as authored by an operator.
///
/// Invariant (checked by `conductor-workflow` when locking this into a
/// `Flow`): every successor id referenced in any `transitions` list, and
/// every id in `start`, must exist in `nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDef {
  pub name: String,
  pub start: Vec<NodeId>,
  pub nodes: BTreeMap<NodeId, NodeDef>,
}
