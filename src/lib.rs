//! ==============================================================================
//! sensorhub - sensor ingestion + Grafana SimpleJSON datasource
//! ==============================================================================
//!
//! purpose:
//!     field nodes POST readings to /receive_sensor_data; Grafana discovers
//!     series via /search and pulls time-bounded datapoints via /query.
//!     everything in between is one flat MongoDB collection of timestamped
//!     readings.
//!
//! responsibilities:
//!     - config: load sensorhub.toml (or defaults) + env overrides
//!     - store: narrow gateway over the readings collection
//!     - routes: the five HTTP handlers and router wiring
//!     - timerange: Grafana's flexible from/to string forms
//!
//! ==============================================================================

pub mod config;
pub mod domain;
pub mod error;
pub mod routes;
pub mod store;
pub mod timerange;
