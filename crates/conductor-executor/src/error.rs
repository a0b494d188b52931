/// Fatal, dispatch-time errors: surfaced before the invocation's work
/// starts, aborting the run (the caller never sees a `NodeOutput` for
/// these).
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
  #[error("unresolvable callable: {0}")]
  UnresolvedCallable(String),

  #[error("process pool is shut down")]
  PoolShutDown,

  #[error("failed to spawn docker: {0}")]
  DockerSpawn(String),
}
