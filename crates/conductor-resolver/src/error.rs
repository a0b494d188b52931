use std::path::PathBuf;

/// Errors raised while resolving a resource or code reference.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
  #[error("unknown alias: {0}")]
  UnknownAlias(String),

  #[error("unsupported reference scheme: {0}")]
  UnsupportedScheme(String),

  #[error("resolved path does not exist: {}", .0.display())]
  NotFound(PathBuf),

  #[error("io error resolving '{reference}': {source}")]
  Io {
    reference: String,
    #[source]
    source: std::io::Error,
  },
}
