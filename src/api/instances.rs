use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::store::{Instance, InstanceAction, InstanceStore, ResourceUsage};

use super::filter::{InstanceFilter, ListInstancesQuery};

pub struct AppState {
    pub store: Arc<InstanceStore>,
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: InstanceAction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUsageRequest {
    pub cpu_usage: u8,
    pub memory_usage: u8,
}

/// Path ids must be plain unsigned integers: ASCII digits only, no sign
fn parse_instance_id(raw: &str) -> Result<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::InvalidInstanceId(raw.to_string()));
    }
    raw.parse()
        .map_err(|_| AppError::InvalidInstanceId(raw.to_string()))
}

pub async fn list_instances(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ListInstancesQuery>, QueryRejection>,
) -> Result<Json<Vec<Instance>>> {
    // A query string that doesn't deserialize (e.g. a repeated key) filters nothing
    let query = query.map(|Query(q)| q).unwrap_or_else(|e| {
        debug!("Ignoring unparseable instance filters: {}", e);
        ListInstancesQuery::default()
    });
    let filter = InstanceFilter::from_query(&query);
    let instances = state.store.list_instances().await;

    Ok(Json(filter.apply(instances)))
}

pub async fn get_instance(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Instance>> {
    let id = parse_instance_id(&raw_id)?;
    let instance = state.store.get_instance(id).await?;

    Ok(Json(instance))
}

pub async fn instance_action(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    payload: std::result::Result<Json<ActionRequest>, JsonRejection>,
) -> Result<Json<Instance>> {
    let id = parse_instance_id(&raw_id)?;

    // Existence is checked before the body so an unknown id is always a 404
    state.store.get_instance(id).await?;

    let Json(req) = payload.map_err(|e| AppError::InvalidAction(e.body_text()))?;
    let instance = state.store.perform_action(id, req.action).await?;

    Ok(Json(instance))
}

pub async fn usage_history(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Vec<ResourceUsage>>> {
    let id = parse_instance_id(&raw_id)?;
    let history = state.store.usage_history(id).await?;

    Ok(Json(history))
}

pub async fn record_usage(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    payload: std::result::Result<Json<RecordUsageRequest>, JsonRejection>,
) -> Result<Json<ResourceUsage>> {
    let id = parse_instance_id(&raw_id)?;
    let Json(req) = payload.map_err(|e| AppError::InvalidUsage(e.body_text()))?;

    let sample = state
        .store
        .record_resource_usage(id, req.cpu_usage, req.memory_usage)
        .await?;

    Ok(Json(sample))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integer_ids() {
        assert_eq!(parse_instance_id("17").unwrap(), 17);
    }

    #[test]
    fn rejects_malformed_ids() {
        for raw in ["abc", "12abc", "-1", "+2", " 3", "", "1.5", "99999999999999999999"] {
            assert!(matches!(
                parse_instance_id(raw),
                Err(AppError::InvalidInstanceId(_))
            ));
        }
    }
}
