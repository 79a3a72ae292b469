use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreGateway;

/// shared handler state
/// `store` is `None` when the database was unreachable at startup;
/// handlers check it first and take their degraded path.
#[derive(Clone)]
pub struct AppState {
    pub store: Option<Arc<dyn StoreGateway>>,
}

/// one persisted sensor observation
#[derive(Clone, Debug, Serialize)]
pub struct Reading {
    /// sensor identifier (e.g., "motor_temp_01")
    pub sensor: String,

    /// observed value, always stored as a float
    pub value: f64,

    /// unit label, "N/A" when the sender omitted it
    pub unit: String,

    /// server-assigned acceptance time (never client-supplied)
    pub timestamp: DateTime<Utc>,
}

/// body of a Grafana /query call
/// every field tolerates absence; a malformed body collapses to the default
#[derive(Debug, Default, Deserialize)]
pub struct SeriesQueryRequest {
    #[serde(default)]
    pub range: RangeSpec,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeSpec {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TargetSpec {
    pub target: Option<String>,
    #[serde(default)]
    pub hide: bool,
}

/// one series in the /query response
#[derive(Debug, Serialize)]
pub struct SeriesResult {
    pub target: String,
    pub datapoints: Vec<Datapoint>,
}

/// a `[value, epoch_milliseconds]` pair, serialized as a two-element array
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Datapoint(pub f64, pub i64);
