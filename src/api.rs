use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The api version of this crate, the server reports it on startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The error text of every failed sensor read.
pub const SENSOR_FAILURE: &str = "Sensor failure. Check wiring.";

/// Body of `POST /execute_computational`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Python source, passed verbatim as `python3 -c <code>`.
    pub code: String,
}

/// Describes the json response format for `/execute_computational`.
///
/// # Serialized Example
/// ```
/// # let ser = r#"
/// {
///     "output": "42",
///     "execution_time": "0.01873 seconds"
/// }
/// # "#;
/// # let deser: remote_lab_api::api::ExecuteResponse
/// #    = serde_json::from_str(ser).expect("failed parsing");
/// # assert!(matches!(deser, remote_lab_api::api::ExecuteResponse::Completed { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecuteResponse {
    Completed {
        /// Combined stdout and stderr, trimmed.
        output: String,
        /// Wall clock time, see [`format_execution_time`].
        execution_time: String,
    },
    Failure {
        error: String,
    },
}

impl ExecuteResponse {
    pub fn completed(output: &str, time_taken: Duration) -> Self {
        ExecuteResponse::Completed {
            output: output.trim().to_owned(),
            execution_time: format_execution_time(time_taken),
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        ExecuteResponse::Failure {
            error: error.to_string(),
        }
    }
}

/// Describes the json response format for `/get_temperature`.
///
/// The `temperature` key carries both values, e.g. `"21.0°C, Humidity: 40.0%"`.
///
/// # Serialized Example
/// ```
/// # let ser = r#"
/// {
///     "error": "Sensor failure. Check wiring."
/// }
/// # "#;
/// # let deser: remote_lab_api::api::TemperatureResponse
/// #    = serde_json::from_str(ser).expect("failed parsing");
/// # assert!(matches!(deser, remote_lab_api::api::TemperatureResponse::Failure { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemperatureResponse {
    Reading { temperature: String },
    Failure { error: String },
}

impl TemperatureResponse {
    pub fn reading(temperature: f32, humidity: f32) -> Self {
        TemperatureResponse::Reading {
            temperature: format!("{temperature:.1}°C, Humidity: {humidity:.1}%"),
        }
    }

    pub fn sensor_failure() -> Self {
        TemperatureResponse::Failure {
            error: String::from(SENSOR_FAILURE),
        }
    }
}

/// Seconds with five decimals, e.g. `"1.50000 seconds"`.
pub fn format_execution_time(time_taken: Duration) -> String {
    format!("{:.5} seconds", time_taken.as_secs_f64())
}
