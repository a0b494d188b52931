use std::collections::BTreeMap;

/// Applies a per-node env overlay to the process environment for the
/// duration of an inline call, restoring the previous values on drop.
/// Callers must hold [`InlineExecutor`](crate::inline::InlineExecutor)'s
/// env mutex for the guard's whole lifetime, so overlapping inline nodes
/// never observe each other's overlay.
pub struct EnvOverlayGuard {
  previous: Vec<(String, Option<String>)>,
}

impl EnvOverlayGuard {
  pub fn apply(overlay: &BTreeMap<String, String>) -> Self {
    let mut previous = Vec::with_capacity(overlay.len());
    for (key, value) in overlay {
      previous.push((key.clone(), std::env::var(key).ok()));
      // SAFETY: callers serialise all env mutation through a dedicated
      // mutex (`InlineExecutor::env_mutex`), so no other thread observes
      // or mutates the environment concurrently with this block.
      unsafe {
        std::env::set_var(key, value);
      }
    }
    Self { previous }
  }
}

impl Drop for EnvOverlayGuard {
  fn drop(&mut self) {
    for (key, value) in self.previous.drain(..) {
      // SAFETY: see `apply` — still under the same serialising mutex.
      unsafe {
        match value {
          Some(v) => std::env::set_var(&key, v),
          None => std::env::remove_var(&key),
        }
      }
    }
  }
}
