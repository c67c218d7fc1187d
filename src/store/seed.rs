use serde_json::json;
use tracing::info;

use crate::error::{AppError, Result};

use super::instance::NewInstance;
use super::manager::InstanceStore;

fn sample_instances() -> serde_json::Result<Vec<NewInstance>> {
    serde_json::from_value(json!([
        {
            "name": "web-server-01",
            "instanceId": "i-1234abcd56ef",
            "status": "running",
            "provider": "aws",
            "ipAddress": "172.31.45.231",
            "cpu": 2,
            "memory": 4,
            "cpuUsage": 65,
            "memoryUsage": 48,
            "uptime": 1058112,
            "metadata": { "region": "us-east-1", "type": "t2.medium" }
        },
        {
            "name": "app-server-02",
            "instanceId": "i-5432abcd56ef",
            "status": "stopped",
            "provider": "aws",
            "cpu": 2,
            "memory": 4,
            "metadata": { "region": "us-west-2", "type": "t2.medium" }
        },
        {
            "name": "db-server-01",
            "instanceId": "gce-5678xyz",
            "status": "running",
            "provider": "gcp",
            "ipAddress": "10.142.15.193",
            "cpu": 4,
            "memory": 16,
            "cpuUsage": 42,
            "memoryUsage": 83,
            "uptime": 766182,
            "metadata": { "zone": "us-central1-a", "machineType": "n2-standard-4" }
        },
        {
            "name": "backend-01",
            "instanceId": "gce-9876xyz",
            "status": "running",
            "provider": "gcp",
            "ipAddress": "10.142.16.78",
            "cpu": 4,
            "memory": 8,
            "cpuUsage": 52,
            "memoryUsage": 56,
            "uptime": 478758,
            "metadata": { "zone": "us-central1-b", "machineType": "n2-standard-2" }
        },
        {
            "name": "app-server-01",
            "instanceId": "inst-openstack-123",
            "status": "pending",
            "provider": "openstack",
            "ipAddress": "192.168.1.45",
            "cpu": 8,
            "memory": 16,
            "cpuUsage": 78,
            "memoryUsage": 62,
            "uptime": 5003,
            "metadata": { "flavor": "m1.large", "region": "region1" }
        }
    ]))
}

/// Populate the store with the demo fleet shown on a fresh dashboard
pub async fn load_sample_data(store: &InstanceStore) -> Result<usize> {
    let samples = sample_instances()
        .map_err(|e| AppError::Internal(format!("Invalid sample data: {}", e)))?;
    let count = samples.len();

    for sample in samples {
        store.create_instance(sample).await?;
    }

    info!("Loaded {} sample instances", count);
    Ok(count)
}
