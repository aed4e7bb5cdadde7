//! Rosterd Core - membership tracking, leader election and slot assignment
//! for a fixed-size cluster coordinated through a shared registry.

pub mod assignment;
pub mod election;
pub mod error;
pub mod liveness;
pub mod manager;
pub mod member;
pub mod publisher;
pub mod registry;

pub use assignment::{resolve, SlotPlan};
pub use error::{Result, RosterError};
pub use liveness::{LivenessTracker, SeenRecord};
pub use manager::{ClusterManager, ManagerSettings};
pub use member::{Member, Registration};
pub use publisher::ensemble::EnsemblePublisher;
pub use publisher::member_list::MemberListPublisher;
pub use publisher::{DownstreamPublisher, MembershipView};
pub use registry::memory::MemoryRegistry;
pub use registry::redis::RedisRegistry;
pub use registry::{DynRegistry, MemberRegistry, RegistryBuilder};
