//! Dialect-dispatching config loading.
//!
//! Mirrors the teacher's direct `serde_json::from_str` read in `main.rs`,
//! generalised to three dialects: JSON (mandatory), YAML, and TOML.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::ConfigError;

enum Dialect {
  Json,
  Yaml,
  Toml,
}

fn dialect_for(path: &Path) -> Result<Dialect, ConfigError> {
  let extension = path
    .extension()
    .and_then(|e| e.to_str())
    .unwrap_or_default()
    .to_ascii_lowercase();

  match extension.as_str() {
    "json" => Ok(Dialect::Json),
    "yaml" | "yml" => Ok(Dialect::Yaml),
    "toml" => Ok(Dialect::Toml),
    other => Err(ConfigError::UnsupportedExtension {
      path: path.to_path_buf(),
      extension: other.to_string(),
    }),
  }
}

/// Read and parse a config file of type `T`, dispatching on file
/// extension. All three dialects produce the same logical structure.
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
  let path: PathBuf = path.as_ref().to_path_buf();
  let dialect = dialect_for(&path)?;
  let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
    path: path.clone(),
    source,
  })?;

  match dialect {
    Dialect::Json => serde_json::from_str(&content).map_err(|source| ConfigError::Json {
      path: path.clone(),
      source,
    }),
    Dialect::Yaml => serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
      path: path.clone(),
      source,
    }),
    Dialect::Toml => toml::from_str(&content).map_err(|source| ConfigError::Toml {
      path: path.clone(),
      source,
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::FlowDef;
  use std::io::Write;

  fn sample_flow_json() -> &'static str {
    r#"{
      "name": "demo",
      "start": ["a"],
      "nodes": {
        "a": { "id": "a", "executor": "inline", "target": "demo:a", "transitions": {} }
      }
    }"#
  }

  #[test]
  fn loads_json_flow() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(sample_flow_json().as_bytes()).unwrap();
    let flow: FlowDef = load(file.path()).unwrap();
    assert_eq!(flow.name, "demo");
    assert_eq!(flow.start, vec!["a".to_string()]);
  }

  #[test]
  fn loads_yaml_flow() {
    let yaml = r#"
name: demo
start: [a]
nodes:
  a:
    id: a
    executor: inline
    target: "demo:a"
    transitions: {}
"#;
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    let flow: FlowDef = load(file.path()).unwrap();
    assert_eq!(flow.name, "demo");
  }

  #[test]
  fn loads_toml_flow() {
    let toml_src = r#"
name = "demo"
start = ["a"]

[nodes.a]
id = "a"
executor = "inline"
target = "demo:a"
"#;
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(toml_src.as_bytes()).unwrap();
    let flow: FlowDef = load(file.path()).unwrap();
    assert_eq!(flow.name, "demo");
  }

  #[test]
  fn unsupported_extension_errors() {
    let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
    file.write_all(b"name=demo").unwrap();
    let result: Result<FlowDef, _> = load(file.path());
    assert!(matches!(result, Err(ConfigError::UnsupportedExtension { .. })));
  }
}
