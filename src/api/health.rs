use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::error::Result;

use super::instances::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub instances: usize,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy",
        instances: state.store.instance_count().await,
    }))
}
