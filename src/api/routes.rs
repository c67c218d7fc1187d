use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::store::InstanceStore;

use super::health::health_check;
use super::instances::{
    get_instance, instance_action, list_instances, record_usage, usage_history, AppState,
};
use super::stats::{get_resource_usage, get_stats};

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    AppError::Internal(format!("handler panicked: {}", detail)).into_response()
}

pub fn create_router(store: Arc<InstanceStore>) -> Router {
    let app_state = Arc::new(AppState { store });

    let api_routes = Router::new()
        .route("/instances", get(list_instances))
        .route("/instances/{id}", get(get_instance))
        .route("/instances/{id}/action", post(instance_action))
        .route("/instances/{id}/usage", get(usage_history).post(record_usage))
        .route("/stats", get(get_stats))
        .route("/resource-usage", get(get_resource_usage))
        .with_state(app_state.clone());

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .with_state(app_state);

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
