use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

fn default_process_pool_size() -> usize {
  1
}

fn default_max_concurrency() -> usize {
  4
}

/// Remote log shipping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteLoggingConfig {
  #[serde(default)]
  pub target: Option<String>,
  #[serde(default = "default_method")]
  pub method: String,
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
  #[serde(default)]
  pub enabled: bool,
  #[serde(default = "default_verify")]
  pub verify: bool,
}

fn default_method() -> String {
  "POST".to_string()
}

fn default_verify() -> bool {
  true
}

impl Default for RemoteLoggingConfig {
  fn default() -> Self {
    Self {
      target: None,
      method: default_method(),
      headers: BTreeMap::new(),
      enabled: false,
      verify: default_verify(),
    }
  }
}

/// Process-wide configuration consumed by the engine at start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
  #[serde(default)]
  pub env: BTreeMap<String, String>,
  #[serde(default)]
  pub shared_state: BTreeMap<String, Json>,
  #[serde(default)]
  pub remote_logging: RemoteLoggingConfig,
  /// Consumed by the CLI entrypoint, not the engine.
  #[serde(default)]
  pub dependencies: Vec<String>,
  #[serde(default)]
  pub container_registries: Vec<String>,
  #[serde(default = "default_process_pool_size")]
  pub process_pool_size: usize,
  #[serde(default = "default_max_concurrency")]
  pub max_concurrency: usize,
  /// `alias -> location` map consumed by `conductor-resolver`.
  #[serde(default)]
  pub resource_locations: BTreeMap<String, String>,
  #[serde(default)]
  pub code_locations: BTreeMap<String, String>,
  #[serde(default)]
  pub resource_cache_dir: Option<PathBuf>,
}

impl Default for GlobalConfig {
  fn default() -> Self {
    Self {
      env: BTreeMap::new(),
      shared_state: BTreeMap::new(),
      remote_logging: RemoteLoggingConfig::default(),
      dependencies: Vec::new(),
      container_registries: Vec::new(),
      process_pool_size: default_process_pool_size(),
      max_concurrency: default_max_concurrency(),
      resource_locations: BTreeMap::new(),
      code_locations: BTreeMap::new(),
      resource_cache_dir: None,
    }
  }
}
