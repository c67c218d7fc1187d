use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Running,
    Stopped,
    Pending,
    Error,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Pending => "pending",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "stopped" => Some(Self::Stopped),
            "pending" => Some(Self::Pending),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Openstack,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
            Self::Openstack => "openstack",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "aws" => Some(Self::Aws),
            "gcp" => Some(Self::Gcp),
            "openstack" => Some(Self::Openstack),
            _ => None,
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle action a user can request on an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceAction {
    Start,
    Stop,
    Restart,
}

impl fmt::Display for InstanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: u64,
    pub name: String,
    /// Identifier assigned by the cloud provider
    pub instance_id: String,
    pub status: InstanceStatus,
    pub provider: CloudProvider,
    pub ip_address: Option<String>,
    /// vCPU count
    pub cpu: u32,
    /// Memory in GB
    pub memory: u32,
    pub cpu_usage: u8,
    pub memory_usage: u8,
    /// Seconds
    pub uptime: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub metadata: Map<String, JsonValue>,
    /// Bumped on every field write; lets deferred transitions detect they were superseded
    #[serde(skip)]
    pub(crate) generation: u64,
}

impl Instance {
    pub(crate) fn from_new(id: u64, new: NewInstance) -> Self {
        let now = Utc::now();
        let mut instance = Self {
            id,
            name: new.name,
            instance_id: new.instance_id,
            status: new.status,
            provider: new.provider,
            ip_address: new.ip_address,
            cpu: new.cpu,
            memory: new.memory,
            cpu_usage: new.cpu_usage,
            memory_usage: new.memory_usage,
            uptime: new.uptime,
            created_at: now,
            last_updated: now,
            metadata: new.metadata,
            generation: 0,
        };
        instance.enforce_stopped_invariant();
        instance
    }

    pub(crate) fn touch(&mut self) {
        self.last_updated = Utc::now();
        self.generation += 1;
    }

    /// A stopped instance reports no load and no uptime
    pub(crate) fn enforce_stopped_invariant(&mut self) {
        if self.status == InstanceStatus::Stopped {
            self.cpu_usage = 0;
            self.memory_usage = 0;
            self.uptime = 0;
        }
    }

    pub(crate) fn has_ip_address(&self) -> bool {
        self.ip_address.as_deref().is_some_and(|ip| !ip.is_empty())
    }
}

/// Fields supplied when inserting an instance
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInstance {
    pub name: String,
    pub instance_id: String,
    pub status: InstanceStatus,
    pub provider: CloudProvider,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub cpu: u32,
    pub memory: u32,
    #[serde(default)]
    pub cpu_usage: u8,
    #[serde(default)]
    pub memory_usage: u8,
    #[serde(default)]
    pub uptime: u64,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
}

impl NewInstance {
    pub(crate) fn validate(&self) -> Result<()> {
        validate_percentages(self.cpu_usage, self.memory_usage)
    }
}

/// Partial update merged onto an existing instance; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceUpdate {
    pub name: Option<String>,
    pub instance_id: Option<String>,
    pub status: Option<InstanceStatus>,
    pub provider: Option<CloudProvider>,
    /// An empty string clears the address
    pub ip_address: Option<String>,
    pub cpu: Option<u32>,
    pub memory: Option<u32>,
    pub cpu_usage: Option<u8>,
    pub memory_usage: Option<u8>,
    pub uptime: Option<u64>,
    pub metadata: Option<Map<String, JsonValue>>,
}

impl InstanceUpdate {
    pub(crate) fn validate(&self) -> Result<()> {
        validate_percentages(self.cpu_usage.unwrap_or(0), self.memory_usage.unwrap_or(0))
    }

    pub(crate) fn apply_to(self, instance: &mut Instance) {
        if let Some(name) = self.name {
            instance.name = name;
        }
        if let Some(instance_id) = self.instance_id {
            instance.instance_id = instance_id;
        }
        if let Some(status) = self.status {
            instance.status = status;
        }
        if let Some(provider) = self.provider {
            instance.provider = provider;
        }
        if let Some(ip_address) = self.ip_address {
            instance.ip_address = Some(ip_address).filter(|ip| !ip.is_empty());
        }
        if let Some(cpu) = self.cpu {
            instance.cpu = cpu;
        }
        if let Some(memory) = self.memory {
            instance.memory = memory;
        }
        if let Some(cpu_usage) = self.cpu_usage {
            instance.cpu_usage = cpu_usage;
        }
        if let Some(memory_usage) = self.memory_usage {
            instance.memory_usage = memory_usage;
        }
        if let Some(uptime) = self.uptime {
            instance.uptime = uptime;
        }
        if let Some(metadata) = self.metadata {
            instance.metadata = metadata;
        }
        instance.enforce_stopped_invariant();
    }
}

/// A single CPU/memory reading; appended, never mutated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub id: u64,
    pub instance_id: u64,
    pub timestamp: DateTime<Utc>,
    pub cpu_usage: u8,
    pub memory_usage: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_instances: usize,
    pub running_instances: usize,
    pub pending_instances: usize,
    pub stopped_instances: usize,
    pub error_instances: usize,
    pub total_cpu: u64,
    pub total_memory: u64,
}

pub(crate) fn validate_percentages(cpu_usage: u8, memory_usage: u8) -> Result<()> {
    if cpu_usage > 100 || memory_usage > 100 {
        return Err(AppError::InvalidUsage(format!(
            "usage must be between 0 and 100 (cpu={}, memory={})",
            cpu_usage, memory_usage
        )));
    }
    Ok(())
}
