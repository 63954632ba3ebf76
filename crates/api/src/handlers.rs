use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use stockcast_core::error::StockcastError;

use crate::error::ApiError;
use crate::state::AppState;

// ── Predict ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub stock: String,
    /// Days to forecast; the configured default when absent.
    #[serde(default)]
    pub steps: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<f64>,
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(req) = payload.map_err(|rej| StockcastError::InvalidRequest(rej.body_text()))?;
    let predictions = state.forecaster.predict(&req.stock, req.steps).await?;
    Ok(Json(PredictResponse { predictions }))
}

// ── Health ──────────────────────────────────────────────────────────

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "artifact_source": state.forecaster.source_name(),
        "forecast": {
            "window_size": state.config.forecast.window_size,
            "default_steps": state.config.forecast.default_steps,
            "max_steps": state.config.forecast.max_steps,
        },
    }))
}
