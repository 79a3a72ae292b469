//! ==============================================================================
//! routes.rs - HTTP handlers
//! ==============================================================================
//!
//! purpose:
//!     the five endpoints of the Grafana Simple-JSON datasource contract plus
//!     the ingest endpoint the field nodes POST to:
//!
//! ```text
//!         /                     health / connection probe
//!         /search               distinct sensor names
//!         /query                per-target datapoint arrays
//!         /annotations          always [] (no annotation support)
//!         /receive_sensor_data  ingest one reading
//! ```
//!
//! compatibility contract:
//!     a dashboard must never see a hard failure, only "no data". the query
//!     path therefore answers 200 with an empty or partial body on a missing
//!     store, malformed JSON, or an unparseable time range. the internal
//!     distinction between "no data" and "error" survives as tracing output.
//!
//! ==============================================================================

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bson::{Bson, Document};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::domain::{AppState, Datapoint, Reading, SeriesQueryRequest, SeriesResult};
use crate::error::IngestError;
use crate::timerange;

/// per-target cap on returned datapoints
pub const MAX_DATAPOINTS: i64 = 5000;

/// what /search answers when the store is empty or unreachable: the two
/// sensors the field firmware publishes, so a fresh Grafana setup can still
/// be wired up before any data arrives.
pub const FALLBACK_SENSORS: [&str; 2] = ["motor_temp_01", "motor_current_01"];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler).post(root_handler))
        .route("/search", get(search_handler).post(search_handler))
        .route("/query", post(query_handler))
        .route(
            "/annotations",
            get(annotations_handler).post(annotations_handler),
        )
        .route("/receive_sensor_data", post(receive_sensor_data))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Grafana's "test connection" probe
pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "OK" }))
}

/// annotations are not supported; the datasource contract still requires the
/// endpoint to exist and answer an empty array
pub async fn annotations_handler() -> Json<Vec<Value>> {
    Json(Vec::new())
}

/// series discovery: distinct sensor names, or the fallback pair
pub async fn search_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    if let Some(store) = &state.store {
        match store.distinct_sensors().await {
            Ok(sensors) if !sensors.is_empty() => return Json(sensors),
            Ok(_) => {}
            Err(e) => warn!("sensor discovery failed: {e:#}"),
        }
    }

    Json(FALLBACK_SENSORS.iter().map(|s| s.to_string()).collect())
}

/// time-series query: one datapoint array per non-hidden target, in request
/// order. always 200; see the module header for the degradation rules.
pub async fn query_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<Vec<SeriesResult>> {
    let Some(store) = &state.store else {
        warn!("query received while store unavailable, answering with no data");
        return Json(Vec::new());
    };

    let request: SeriesQueryRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        warn!("malformed query body, answering with no data: {e}");
        SeriesQueryRequest::default()
    });

    // a half-parsed range is as good as none: only filter when both bounds
    // parsed, otherwise rely on the datapoint cap
    let from = timerange::parse(request.range.from.as_deref());
    let to = timerange::parse(request.range.to.as_deref());
    let range = from.zip(to);

    let mut results = Vec::with_capacity(request.targets.len());
    for spec in &request.targets {
        if spec.hide {
            continue;
        }
        let Some(target) = spec.target.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };

        let datapoints = match store.find_readings(target, range, MAX_DATAPOINTS).await {
            Ok(documents) => shape_datapoints(&documents),
            Err(e) => {
                warn!(sensor = target, "series query failed: {e:#}");
                Vec::new()
            }
        };

        results.push(SeriesResult {
            target: target.to_string(),
            datapoints,
        });
    }

    Json(results)
}

/// ingest one reading: validate, normalize, persist with a server-assigned
/// timestamp. fail-fast order: store, payload, required fields, value.
pub async fn receive_sensor_data(
    State(state): State<AppState>,
    payload: Option<Json<Value>>,
) -> Result<impl IntoResponse, IngestError> {
    let Some(store) = &state.store else {
        return Err(IngestError::StoreUnavailable);
    };

    let Some(Json(payload)) = payload else {
        return Err(IngestError::MissingPayload);
    };
    let fields = payload.as_object().ok_or(IngestError::MissingPayload)?;

    let sensor = first_string(fields, &["sensor_type", "sensor"]);
    let raw_value = fields.get("value");
    let (sensor, raw_value) = match (sensor, raw_value) {
        (Some(sensor), Some(raw_value)) => (sensor, raw_value),
        _ => return Err(IngestError::MissingRequiredField),
    };

    let value = coerce_value(raw_value).ok_or(IngestError::InvalidValue)?;
    let unit = fields
        .get("unit")
        .and_then(Value::as_str)
        .unwrap_or("N/A")
        .to_string();

    let reading = Reading {
        sensor: sensor.to_string(),
        value,
        unit,
        timestamp: Utc::now(),
    };

    let id = store.insert_reading(&reading).await.map_err(|e| {
        warn!(sensor = %reading.sensor, "insert failed: {e:#}");
        IngestError::StoreUnavailable
    })?;

    info!(sensor = %reading.sensor, value = reading.value, id = %id, "stored reading");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Data received and stored",
            "mongo_id": id,
            "data_received": {
                "sensor": reading.sensor,
                "value": reading.value,
                "unit": reading.unit,
                "timestamp": reading.timestamp.to_rfc3339(),
            },
        })),
    ))
}

/// first non-empty string among the given keys, in order
fn first_string<'a>(fields: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| fields.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

/// coerce an ingest `value` to a finite float. accepts JSON numbers and
/// numeric strings (the first firmware revision sent values as strings).
fn coerce_value(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// stored documents to `[value, epoch_ms]` pairs. documents missing a usable
/// value or a timestamp are skipped, never an error.
fn shape_datapoints(documents: &[Document]) -> Vec<Datapoint> {
    documents
        .iter()
        .filter_map(|document| {
            let value = extract_value(document)?;
            let timestamp = document.get_datetime("timestamp").ok()?;
            Some(Datapoint(value, timestamp.timestamp_millis()))
        })
        .collect()
}

/// value of a stored document: `value` wins, legacy `valor` is the fallback
fn extract_value(document: &Document) -> Option<f64> {
    ["value", "valor"]
        .iter()
        .find_map(|key| document.get(key).and_then(bson_to_f64))
}

fn bson_to_f64(raw: &Bson) -> Option<f64> {
    match raw {
        Bson::Double(v) if v.is_finite() => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use chrono::TimeZone;

    #[test]
    fn test_coerce_value_forms() {
        assert_eq!(coerce_value(&json!(30.1)), Some(30.1));
        assert_eq!(coerce_value(&json!(42)), Some(42.0));
        assert_eq!(coerce_value(&json!("31.5")), Some(31.5));
        assert_eq!(coerce_value(&json!(" 7 ")), Some(7.0));
        assert_eq!(coerce_value(&json!("abc")), None);
        assert_eq!(coerce_value(&json!(true)), None);
        assert_eq!(coerce_value(&json!(null)), None);
        assert_eq!(coerce_value(&json!({"v": 1})), None);
        assert_eq!(coerce_value(&json!("inf")), None);
    }

    #[test]
    fn test_first_string_order_and_emptiness() {
        let fields = json!({ "sensor_type": "temp", "sensor": "other" });
        assert_eq!(
            first_string(fields.as_object().unwrap(), &["sensor_type", "sensor"]),
            Some("temp")
        );

        let fields = json!({ "sensor": "other" });
        assert_eq!(
            first_string(fields.as_object().unwrap(), &["sensor_type", "sensor"]),
            Some("other")
        );

        let fields = json!({ "sensor_type": "" });
        assert_eq!(
            first_string(fields.as_object().unwrap(), &["sensor_type", "sensor"]),
            None
        );

        let fields = json!({ "sensor_type": 12 });
        assert_eq!(
            first_string(fields.as_object().unwrap(), &["sensor_type", "sensor"]),
            None
        );
    }

    #[test]
    fn test_extract_value_prefers_value_over_valor() {
        let both = doc! { "value": 1.5, "valor": 9.9 };
        assert_eq!(extract_value(&both), Some(1.5));

        let legacy = doc! { "valor": 9.9 };
        assert_eq!(extract_value(&legacy), Some(9.9));

        let neither = doc! { "unit": "C" };
        assert_eq!(extract_value(&neither), None);
    }

    #[test]
    fn test_shape_datapoints_skips_unusable_documents() {
        let ts = bson::DateTime::from_chrono(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let documents = vec![
            doc! { "sensor": "temp", "value": 30.1, "timestamp": ts },
            // legacy field name, string-typed value
            doc! { "sensor": "temp", "valor": "31.0", "timestamp": ts },
            // no timestamp
            doc! { "sensor": "temp", "value": 1.0 },
            // no usable value
            doc! { "sensor": "temp", "value": "abc", "timestamp": ts },
            // integer-typed value
            doc! { "sensor": "temp", "value": 32_i32, "timestamp": ts },
        ];

        let points = shape_datapoints(&documents);
        let ms = ts.timestamp_millis();
        assert_eq!(
            points,
            vec![
                Datapoint(30.1, ms),
                Datapoint(31.0, ms),
                Datapoint(32.0, ms),
            ]
        );
    }
}
