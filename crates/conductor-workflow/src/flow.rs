use std::collections::BTreeMap;

use conductor_config::{FlowDef, NodeDef};
use conductor_node::NodeId;

use crate::error::FlowError;

/// A validated, locked flow ready for execution.
///
/// `Flow` is read-only after [`Flow::lock`]; the engine holds a shared
/// reference (`Arc<Flow>`) for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
  pub name: String,
  pub start: Vec<NodeId>,
  pub nodes: BTreeMap<NodeId, NodeDef>,
}

impl Flow {
  /// Validate a [`FlowDef`] and lock it into a [`Flow`].
  ///
  /// Invariant: every successor id referenced in any `transitions` list,
  /// and every id in `start`, must exist in `nodes`.
  pub fn lock(def: FlowDef) -> Result<Self, FlowError> {
    if def.start.is_empty() {
      return Err(FlowError::EmptyStart);
    }

    for start_id in &def.start {
      if !def.nodes.contains_key(start_id) {
        return Err(FlowError::UnknownStartNode(start_id.clone()));
      }
    }

    for (node_id, node) in &def.nodes {
      for (status, successors) in &node.transitions {
        for successor in successors {
          if !def.nodes.contains_key(successor) {
            return Err(FlowError::UnknownSuccessor {
              node: node_id.clone(),
              status: status.clone(),
              successor: successor.clone(),
            });
          }
        }
      }
    }

    Ok(Self {
      name: def.name,
      start: def.start,
      nodes: def.nodes,
    })
  }

  /// Look up a node definition by id.
  pub fn get_node(&self, id: &str) -> Option<&NodeDef> {
    self.nodes.get(id)
  }

  /// Iterate `(from_id, status, to_id)` triples for every transition edge
  /// declared in the flow — used by the Mermaid renderer.
  pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &str)> {
    self.nodes.iter().flat_map(|(from, node)| {
      node.transitions.iter().flat_map(move |(status, tos)| {
        tos
          .iter()
          .map(move |to| (from.as_str(), status.as_str(), to.as_str()))
      })
    })
  }
}
