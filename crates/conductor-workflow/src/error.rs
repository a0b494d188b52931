use conductor_node::NodeId;

/// Configuration errors raised while locking a `FlowDef`, fatal: the run
/// aborts before any node executes.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
  #[error("flow has no start nodes")]
  EmptyStart,

  #[error("start node '{0}' is not defined in nodes")]
  UnknownStartNode(NodeId),

  #[error("node '{node}' transitions[{status}] references unknown node '{successor}'")]
  UnknownSuccessor {
    node: NodeId,
    status: String,
    successor: NodeId,
  },
}
