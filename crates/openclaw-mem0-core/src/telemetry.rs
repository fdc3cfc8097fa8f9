//! Best-effort usage beacons.
//!
//! The client reports one event per operation through [`Telemetry`]. Beacons
//! are fire-and-forget: delivery failures are logged at debug level and never
//! reach the caller.

use crate::config::Mem0Config;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TelemetryEvent {
    pub name: String,
    pub distinct_id: String,
    pub properties: Value,
}

pub trait Telemetry: Send + Sync {
    fn capture(&self, event: TelemetryEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn capture(&self, _event: TelemetryEvent) {}
}

/// Posts each event as JSON to a collector endpoint on the current tokio
/// runtime.
#[derive(Debug, Clone)]
pub struct BeaconTelemetry {
    http: reqwest::Client,
    endpoint: String,
}

impl BeaconTelemetry {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Telemetry for BeaconTelemetry {
    fn capture(&self, event: TelemetryEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(event = %event.name, "no async runtime; dropping telemetry beacon");
            return;
        };

        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let body = json!({
            "uuid": uuid::Uuid::new_v4(),
            "event": event.name,
            "distinct_id": event.distinct_id,
            "properties": event.properties,
            "timestamp": Utc::now().to_rfc3339(),
        });

        runtime.spawn(async move {
            match http.post(&endpoint).json(&body).send().await {
                Ok(response) if !response.status().is_success() => {
                    debug!(status = %response.status(), "telemetry beacon rejected");
                }
                Ok(_) => {}
                Err(error) => debug!(%error, "telemetry beacon failed"),
            }
        });
    }
}

/// The collaborator selected by configuration; no-op unless telemetry is
/// switched on and a collector URL is known.
#[must_use]
pub fn telemetry_from_config(config: &Mem0Config) -> Arc<dyn Telemetry> {
    if !config.telemetry_enabled {
        return Arc::new(NoopTelemetry);
    }
    match config.telemetry_url.as_deref() {
        Some(url) => Arc::new(BeaconTelemetry::new(url)),
        None => {
            warn!("MEM0_TELEMETRY is on but no MEM0_TELEMETRY_URL is set; telemetry disabled");
            Arc::new(NoopTelemetry)
        }
    }
}
