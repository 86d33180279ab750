use std::sync::Arc;

use crate::pages;
use crate::process::{process, Interpreter};
use crate::sensor::Sensor;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use remote_lab_api::api::{ExecuteRequest, ExecuteResponse, TemperatureResponse};

/// Everything the handlers need, fixed at startup.
#[derive(Debug)]
pub struct Lab {
    pub interpreter: Interpreter,
    pub sensor: Box<dyn Sensor>,
}

/// The pages and their json endpoints.
pub fn routes(lab: Arc<Lab>) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/computational_lab", get(pages::computational_lab))
        .route("/temperature_lab", get(pages::temperature_lab))
        .route("/execute_computational", post(execute_computational))
        .route("/get_temperature", get(get_temperature))
        .with_state(lab)
}

/// Failures are reported in the body, the status is always `200 OK`.
async fn execute_computational(
    State(lab): State<Arc<Lab>>,
    request: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Json<ExecuteResponse> {
    let id = fastrand::u64(..);

    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            log::info!(id; "rejected request: {rejection}");
            return Json(ExecuteResponse::failure(rejection.body_text()));
        }
    };
    log::info!(id; "received code");
    log::debug!(id; "code: {:?}", request.code);

    let command = lab.interpreter.command(&request.code);
    match process(id, command, lab.interpreter.timeout).await {
        Ok(execution) => {
            log::info!(id, time_taken:debug = execution.time_taken; "completed");
            Json(ExecuteResponse::completed(&execution.output, execution.time_taken))
        }
        Err(e) => {
            log::info!(id; "Failed: {e}");
            Json(ExecuteResponse::failure(e))
        }
    }
}

async fn get_temperature(State(lab): State<Arc<Lab>>) -> Json<TemperatureResponse> {
    let reading = tokio::task::spawn_blocking(move || lab.sensor.read()).await;

    match reading {
        Ok(Ok(reading)) => {
            log::debug!(
                temperature = reading.temperature,
                humidity = reading.humidity;
                "sensor read"
            );
            Json(TemperatureResponse::reading(reading.temperature, reading.humidity))
        }
        Ok(Err(e)) => {
            log::warn!(e:display; "sensor read failed");
            Json(TemperatureResponse::sensor_failure())
        }
        Err(e) => {
            log::error!(e:display; "sensor task panicked");
            Json(TemperatureResponse::sensor_failure())
        }
    }
}
