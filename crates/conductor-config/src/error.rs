use std::path::PathBuf;

/// Configuration loading errors — all fatal: malformed flow/global config
/// aborts before any node executes.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{path}: unsupported config extension {extension:?} (expected json, yaml, yml, or toml)")]
  UnsupportedExtension { path: PathBuf, extension: String },

  #[error("{path}: invalid json: {source}")]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("{path}: invalid yaml: {source}")]
  Yaml {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("{path}: invalid toml: {source}")]
  Toml {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}
