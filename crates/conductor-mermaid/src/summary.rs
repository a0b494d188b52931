use conductor_trace::TraceEntry;
use serde_json::{Map, Value as Json};

use crate::stats::collect;

/// Per-node aggregate statistics over `trace`, as a JSON object keyed by
/// node id: `{runs, statuses: {status: count}, total_duration_ms,
/// avg_duration_ms, last_status}`.
pub fn summary(trace: &[TraceEntry]) -> Json {
  let mut out = Map::new();
  for (node_id, stats) in collect(trace) {
    let mut statuses = Map::new();
    for (status, count) in &stats.statuses {
      statuses.insert(status.clone(), Json::from(*count));
    }
    out.insert(
      node_id,
      serde_json::json!({
        "runs": stats.runs,
        "statuses": statuses,
        "total_duration_ms": stats.total_duration_ms,
        "avg_duration_ms": stats.avg_duration_ms(),
        "last_status": stats.last_status,
      }),
    );
  }
  Json::Object(out)
}
