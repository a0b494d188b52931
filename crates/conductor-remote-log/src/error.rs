/// Only the client construction step can fail here; shipping a log entry
/// never returns an error — transport failures are logged, not
/// propagated.
#[derive(Debug, thiserror::Error)]
pub enum RemoteLogError {
  #[error("failed to build remote logging client: {0}")]
  ClientBuild(#[from] reqwest::Error),
}
