pub mod instance;
pub mod manager;
pub mod seed;

pub use instance::{
    CloudProvider, DashboardStats, Instance, InstanceAction, InstanceStatus, InstanceUpdate,
    NewInstance, ResourceUsage,
};
pub use manager::InstanceStore;
