//! Conductor Trace
//!
//! Append-only record of node invocations within a flow run —
//! [`TraceEntry`] plus the mutex-guarded [`TraceRecorder`] that appends to
//! it on node completion.

mod entry;
mod recorder;

pub use entry::{PREVIEW_LIMIT, TraceEntry, truncate_preview};
pub use recorder::TraceRecorder;
