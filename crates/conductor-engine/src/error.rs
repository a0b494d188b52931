use conductor_node::NodeId;
use conductor_workflow::FlowError;

/// Errors that abort a run outright. The engine itself never aborts a run
/// because a node failed; it only aborts on configuration errors raised
/// at dispatch preparation (missing callable module, missing successor
/// id). Missing successor ids are caught by
/// [`conductor_workflow::Flow::lock`] before a run starts; what remains
/// here is the callable-resolution check the engine repeats right before
/// each dispatch (the registry may have been repopulated since `lock`).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  #[error("flow validation failed: {0}")]
  InvalidFlow(#[from] FlowError),
  #[error("node '{0}' is not resolvable: {1}")]
  UnresolvedCallable(NodeId, String),
  #[error("node '{0}' referenced in the pending set does not exist in the flow")]
  NodeNotFound(NodeId),
  #[error("dispatcher task panicked: {0}")]
  DispatchPanicked(String),
}
