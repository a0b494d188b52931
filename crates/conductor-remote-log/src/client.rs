use chrono::Utc;
use conductor_config::RemoteLoggingConfig;
use reqwest::Method;
use serde_json::Value as Json;
use tracing::warn;

use crate::error::RemoteLogError;

/// Ships structured log entries to an external collector.
///
/// `log` is fire-and-forget: a transport failure is logged via
/// `tracing::warn!` and never propagates — the remote logger sits outside
/// the critical path. Disabled
/// (`enabled: false` or no `target`) loggers short-circuit without making
/// a request.
pub struct RemoteLogger {
  config: RemoteLoggingConfig,
  client: reqwest::Client,
}

impl RemoteLogger {
  pub fn new(config: RemoteLoggingConfig) -> Result<Self, RemoteLogError> {
    let client = reqwest::Client::builder()
      .danger_accept_invalid_certs(!config.verify)
      .build()?;
    Ok(Self { config, client })
  }

  /// Ship one log entry as `{timestamp, level, message, context}` — a
  /// no-op when remote logging is disabled or unconfigured.
  pub async fn log(&self, level: &str, message: &str, context: Json) {
    if !self.config.enabled {
      return;
    }
    let Some(target) = &self.config.target else {
      return;
    };

    let method = Method::from_bytes(self.config.method.as_bytes()).unwrap_or(Method::POST);
    let payload = serde_json::json!({
      "timestamp": Utc::now().to_rfc3339(),
      "level": level,
      "message": message,
      "context": context,
    });

    let mut request = self.client.request(method, target);
    for (key, value) in &self.config.headers {
      request = request.header(key, value);
    }

    if let Err(e) = request.json(&payload).send().await {
      warn!(error = %e, target = %target, "remote log shipping failed");
    }
  }
}
