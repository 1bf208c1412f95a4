use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::services::DeviceService;

pub async fn health_check(State(service): State<DeviceService>) -> (StatusCode, Json<Value>) {
    let devices = service.device_count().await;

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "devices": devices,
        })),
    )
}
