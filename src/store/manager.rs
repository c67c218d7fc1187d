use chrono::Utc;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info};

use crate::error::{AppError, Result};

use super::instance::{
    validate_percentages, CloudProvider, DashboardStats, Instance, InstanceAction,
    InstanceStatus, InstanceUpdate, NewInstance, ResourceUsage,
};

/// Load reported by a freshly started instance
const BASELINE_USAGE: Range<u8> = 20..50;

#[derive(Default)]
struct StoreState {
    /// Keyed by sequential id, so iteration follows insertion order
    instances: BTreeMap<u64, Instance>,
    usage: HashMap<u64, Vec<ResourceUsage>>,
    next_instance_id: u64,
    next_usage_id: u64,
}

/// Authoritative in-memory set of instances and their usage history
pub struct InstanceStore {
    state: RwLock<StoreState>,
    restart_delay: Duration,
}

impl InstanceStore {
    pub fn new(restart_delay: Duration) -> Self {
        Self {
            state: RwLock::new(StoreState {
                next_instance_id: 1,
                next_usage_id: 1,
                ..Default::default()
            }),
            restart_delay,
        }
    }

    pub async fn list_instances(&self) -> Vec<Instance> {
        self.state.read().await.instances.values().cloned().collect()
    }

    pub async fn get_instance(&self, id: u64) -> Result<Instance> {
        self.state
            .read()
            .await
            .instances
            .get(&id)
            .cloned()
            .ok_or(AppError::InstanceNotFound)
    }

    /// Look up an instance by its provider-assigned identifier
    pub async fn find_by_instance_id(&self, instance_id: &str) -> Option<Instance> {
        self.state
            .read()
            .await
            .instances
            .values()
            .find(|i| i.instance_id == instance_id)
            .cloned()
    }

    pub async fn create_instance(&self, new: NewInstance) -> Result<Instance> {
        new.validate()?;

        let mut state = self.state.write().await;
        let id = state.next_instance_id;
        state.next_instance_id += 1;

        let instance = Instance::from_new(id, new);
        state.instances.insert(id, instance.clone());

        debug!("Created instance {} ({})", id, instance.name);
        Ok(instance)
    }

    pub async fn update_instance(&self, id: u64, update: InstanceUpdate) -> Result<Instance> {
        update.validate()?;

        let mut state = self.state.write().await;
        let instance = state
            .instances
            .get_mut(&id)
            .ok_or(AppError::InstanceNotFound)?;

        update.apply_to(instance);
        instance.touch();
        Ok(instance.clone())
    }

    /// Remove an instance and its usage history; returns whether it existed
    pub async fn delete_instance(&self, id: u64) -> bool {
        let mut state = self.state.write().await;
        state.usage.remove(&id);
        state.instances.remove(&id).is_some()
    }

    pub async fn filter_by_provider(&self, provider: CloudProvider) -> Vec<Instance> {
        self.state
            .read()
            .await
            .instances
            .values()
            .filter(|i| i.provider == provider)
            .cloned()
            .collect()
    }

    pub async fn filter_by_status(&self, status: InstanceStatus) -> Vec<Instance> {
        self.state
            .read()
            .await
            .instances
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect()
    }

    pub async fn usage_history(&self, id: u64) -> Result<Vec<ResourceUsage>> {
        let state = self.state.read().await;
        if !state.instances.contains_key(&id) {
            return Err(AppError::InstanceNotFound);
        }
        Ok(state.usage.get(&id).cloned().unwrap_or_default())
    }

    /// Append a usage sample and copy it onto the instance's live gauges
    pub async fn record_resource_usage(
        &self,
        id: u64,
        cpu_usage: u8,
        memory_usage: u8,
    ) -> Result<ResourceUsage> {
        validate_percentages(cpu_usage, memory_usage)?;

        let mut state = self.state.write().await;
        let StoreState {
            instances,
            usage,
            next_usage_id,
            ..
        } = &mut *state;

        let instance = instances.get_mut(&id).ok_or(AppError::InstanceNotFound)?;

        let sample = ResourceUsage {
            id: *next_usage_id,
            instance_id: id,
            timestamp: Utc::now(),
            cpu_usage,
            memory_usage,
        };
        *next_usage_id += 1;
        usage.entry(id).or_default().push(sample.clone());

        if instance.status == InstanceStatus::Stopped {
            debug!("Instance {} is stopped, keeping its gauges at zero", id);
        } else {
            instance.cpu_usage = cpu_usage;
            instance.memory_usage = memory_usage;
            instance.last_updated = sample.timestamp;
        }

        Ok(sample)
    }

    /// Aggregate counts and capacity, recomputed on every call
    pub async fn compute_stats(&self) -> DashboardStats {
        let state = self.state.read().await;
        let mut stats = DashboardStats::default();

        for instance in state.instances.values() {
            stats.total_instances += 1;
            match instance.status {
                InstanceStatus::Running => stats.running_instances += 1,
                InstanceStatus::Pending => stats.pending_instances += 1,
                InstanceStatus::Stopped => stats.stopped_instances += 1,
                InstanceStatus::Error => stats.error_instances += 1,
            }
            stats.total_cpu += u64::from(instance.cpu);
            stats.total_memory += u64::from(instance.memory);
        }

        stats
    }

    pub async fn instance_count(&self) -> usize {
        self.state.read().await.instances.len()
    }

    /// Apply a lifecycle action and return the resulting snapshot.
    ///
    /// `restart` returns while the instance is still `pending`; the transition
    /// back to `running` happens on a timer task.
    pub async fn perform_action(
        self: &Arc<Self>,
        id: u64,
        action: InstanceAction,
    ) -> Result<Instance> {
        let mut state = self.state.write().await;
        let instance = state
            .instances
            .get_mut(&id)
            .ok_or(AppError::InstanceNotFound)?;

        match action {
            InstanceAction::Start => {
                if instance.status == InstanceStatus::Running {
                    return Err(AppError::AlreadyRunning);
                }
                instance.status = InstanceStatus::Running;
                instance.cpu_usage = baseline_usage();
                instance.memory_usage = baseline_usage();
                instance.touch();
            }
            InstanceAction::Stop => {
                if instance.status == InstanceStatus::Stopped {
                    return Err(AppError::AlreadyStopped);
                }
                instance.status = InstanceStatus::Stopped;
                instance.enforce_stopped_invariant();
                instance.touch();
            }
            InstanceAction::Restart => {
                instance.status = InstanceStatus::Pending;
                instance.touch();
                self.schedule_restart_completion(id, instance.generation);
            }
        }

        info!("Applied {} to instance {} ({})", action, id, instance.name);
        Ok(instance.clone())
    }

    fn schedule_restart_completion(self: &Arc<Self>, id: u64, generation: u64) {
        let store = Arc::clone(self);
        let delay = self.restart_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if store.complete_restart(id, generation).await {
                info!("Instance {} finished restarting", id);
            }
        });
    }

    /// Bring a restarting instance back to `running`, unless it was deleted or
    /// written to since the restart was requested.
    pub(crate) async fn complete_restart(&self, id: u64, generation: u64) -> bool {
        let mut state = self.state.write().await;
        match state.instances.get_mut(&id) {
            Some(instance)
                if instance.status == InstanceStatus::Pending
                    && instance.generation == generation =>
            {
                instance.status = InstanceStatus::Running;
                instance.cpu_usage = baseline_usage();
                instance.memory_usage = baseline_usage();
                instance.touch();
                true
            }
            Some(instance) => {
                debug!(
                    "Dropping restart completion for instance {}: now {} (generation {} != {})",
                    id, instance.status, instance.generation, generation
                );
                false
            }
            None => {
                debug!("Dropping restart completion for deleted instance {}", id);
                false
            }
        }
    }

    pub fn start_uptime_task(self: Arc<Self>, tick: Duration) {
        if tick.is_zero() {
            return;
        }

        tokio::spawn(async move {
            let mut ticker = interval(tick);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                self.advance_uptime(tick.as_secs()).await;
            }
        });
    }

    async fn advance_uptime(&self, secs: u64) {
        let mut state = self.state.write().await;
        for instance in state.instances.values_mut() {
            if instance.status == InstanceStatus::Running {
                instance.uptime += secs;
            }
        }
    }
}

fn baseline_usage() -> u8 {
    rand::thread_rng().gen_range(BASELINE_USAGE)
}
