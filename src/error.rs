//! ingest error taxonomy and its HTTP mapping
//!
//! only the ingest path reports errors to callers. the query path must never
//! hard-fail a dashboard, so its failures are logged and collapsed to empty
//! responses inside routes.rs instead of going through this type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    /// checked before validation: no store handle, or the write itself failed
    #[error("sensor store is not available")]
    StoreUnavailable,

    #[error("no JSON payload received")]
    MissingPayload,

    #[error("payload must include 'sensor_type' (or 'sensor') and 'value'")]
    MissingRequiredField,

    #[error("'value' could not be interpreted as a number")]
    InvalidValue,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = match self {
            IngestError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            IngestError::MissingPayload
            | IngestError::MissingRequiredField
            | IngestError::InvalidValue => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
