use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::ResolveError;

const ALIAS_PREFIX: &str = "alias://";

/// Resolves a resource or code reference string — `alias://`, direct URL,
/// or filesystem path — to a local filesystem path.
///
/// Modelled on the teacher's `fuschia-resolver::Resolver` shape (an
/// async trait over a registry); generalised here from wasm-component
/// resolution to flow/code resolution.
#[async_trait]
pub trait Resolver: Send + Sync {
  async fn resolve(&self, reference: &str) -> Result<PathBuf, ResolveError>;
}

/// The only backend this crate provides: direct filesystem paths, plus
/// `alias://` indirection through a statically configured alias table
/// (`GlobalConfig.resource_locations` / `code_locations`). URL and git
/// references are recognised but rejected — live fetch backends are out
/// of scope for this crate, which treats ancillary functionality only as
/// interfaces.
pub struct StandardResolver {
  aliases: BTreeMap<String, String>,
}

impl StandardResolver {
  pub fn new(aliases: BTreeMap<String, String>) -> Self {
    Self { aliases }
  }
}

#[async_trait]
impl Resolver for StandardResolver {
  async fn resolve(&self, reference: &str) -> Result<PathBuf, ResolveError> {
    if let Some(alias) = reference.strip_prefix(ALIAS_PREFIX) {
      let location = self
        .aliases
        .get(alias)
        .ok_or_else(|| ResolveError::UnknownAlias(alias.to_string()))?;
      return Box::pin(self.resolve(location)).await;
    }

    if reference.starts_with("http://") || reference.starts_with("https://") {
      return Err(ResolveError::UnsupportedScheme(reference.to_string()));
    }
    if reference.starts_with("git+") || reference.starts_with("git://") {
      return Err(ResolveError::UnsupportedScheme(reference.to_string()));
    }

    let path = PathBuf::from(reference);
    match tokio::fs::metadata(&path).await {
      Ok(_) => Ok(path),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ResolveError::NotFound(path)),
      Err(source) => Err(ResolveError::Io {
        reference: reference.to_string(),
        source,
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn resolves_an_existing_filesystem_path() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("flow.json");
    tokio::fs::write(&file, b"{}").await.unwrap();

    let resolver = StandardResolver::new(BTreeMap::new());
    let resolved = resolver.resolve(file.to_str().unwrap()).await.unwrap();
    assert_eq!(resolved, file);
  }

  #[tokio::test]
  async fn missing_filesystem_path_is_not_found() {
    let resolver = StandardResolver::new(BTreeMap::new());
    let err = resolver
      .resolve("/does/not/exist/anywhere")
      .await
      .unwrap_err();
    assert!(matches!(err, ResolveError::NotFound(_)));
  }

  #[tokio::test]
  async fn alias_indirects_through_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("flow.json");
    tokio::fs::write(&file, b"{}").await.unwrap();

    let mut aliases = BTreeMap::new();
    aliases.insert("flows".to_string(), file.to_str().unwrap().to_string());
    let resolver = StandardResolver::new(aliases);

    let resolved = resolver.resolve("alias://flows").await.unwrap();
    assert_eq!(resolved, file);
  }

  #[tokio::test]
  async fn unknown_alias_is_an_error() {
    let resolver = StandardResolver::new(BTreeMap::new());
    let err = resolver.resolve("alias://missing").await.unwrap_err();
    assert!(matches!(err, ResolveError::UnknownAlias(_)));
  }

  #[tokio::test]
  async fn http_and_git_references_are_recognised_but_unsupported() {
    let resolver = StandardResolver::new(BTreeMap::new());
    assert!(matches!(
      resolver.resolve("https://example.com/flow.json").await,
      Err(ResolveError::UnsupportedScheme(_))
    ));
    assert!(matches!(
      resolver.resolve("git+https://example.com/repo.git").await,
      Err(ResolveError::UnsupportedScheme(_))
    ));
  }
}
