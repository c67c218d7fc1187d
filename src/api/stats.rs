use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::store::{DashboardStats, Instance};

use super::filter::{InstanceFilter, ResourceUsageQuery};
use super::instances::AppState;

#[derive(Debug, Serialize)]
pub struct UsagePoint {
    pub name: String,
    pub usage: u8,
}

#[derive(Debug, Serialize)]
pub struct ResourceUsageResponse {
    pub cpu: Vec<UsagePoint>,
    pub memory: Vec<UsagePoint>,
}

impl ResourceUsageResponse {
    fn from_instances(instances: &[Instance]) -> Self {
        Self {
            cpu: instances
                .iter()
                .map(|i| UsagePoint {
                    name: i.name.clone(),
                    usage: i.cpu_usage,
                })
                .collect(),
            memory: instances
                .iter()
                .map(|i| UsagePoint {
                    name: i.name.clone(),
                    usage: i.memory_usage,
                })
                .collect(),
        }
    }
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<DashboardStats>> {
    Ok(Json(state.store.compute_stats().await))
}

pub async fn get_resource_usage(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ResourceUsageQuery>, QueryRejection>,
) -> Result<Json<ResourceUsageResponse>> {
    let query = query.map(|Query(q)| q).unwrap_or_else(|e| {
        debug!("Ignoring unparseable resource usage filter: {}", e);
        ResourceUsageQuery::default()
    });
    let filter = InstanceFilter::running_for(&query);
    let instances = filter.apply(state.store.list_instances().await);

    Ok(Json(ResourceUsageResponse::from_instances(&instances)))
}
