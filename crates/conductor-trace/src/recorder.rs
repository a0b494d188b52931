use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::entry::TraceEntry;

/// Append-only, mutex-guarded invocation log.
///
/// Entries are appended on node *completion*, not dispatch, so the
/// recorded order reflects causal completion. The `sequence` counter
/// increments on every *dispatch*, independent of append order, so
/// concurrent completions remain orderable by dispatch order.
#[derive(Debug, Clone)]
pub struct TraceRecorder {
  entries: Arc<Mutex<Vec<TraceEntry>>>,
  next_sequence: Arc<AtomicU64>,
}

impl TraceRecorder {
  pub fn new() -> Self {
    Self {
      entries: Arc::new(Mutex::new(Vec::new())),
      next_sequence: Arc::new(AtomicU64::new(0)),
    }
  }

  /// Allocate the next monotonic sequence number. Called once per
  /// dispatched invocation, before the invocation starts executing.
  pub fn next_sequence(&self) -> u64 {
    self.next_sequence.fetch_add(1, Ordering::SeqCst)
  }

  /// Append a completed entry. Atomic: no two appends interleave.
  pub async fn append(&self, entry: TraceEntry) {
    let mut entries = self.entries.lock().await;
    entries.push(entry);
  }

  /// Snapshot the trace so far, in completion order.
  pub async fn snapshot(&self) -> Vec<TraceEntry> {
    let entries = self.entries.lock().await;
    entries.clone()
  }
}

impl Default for TraceRecorder {
  fn default() -> Self {
    Self::new()
  }
}
