//! Registry module for the shared member table
//!
//! Provides a trait-based abstraction for different backend implementations
//! (Redis, in-memory).

pub mod factory;
pub mod memory;
pub mod redis;

use crate::error::Result;
use crate::member::{Member, Registration};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub use factory::RegistryBuilder;

/// Trait for member registry implementations
#[async_trait]
pub trait MemberRegistry: Send + Sync {
    /// All known members, ordered by store-assigned id ascending
    async fn list(&self) -> Result<Vec<Member>>;

    /// Bump the heartbeat of the row matching the registration's identity,
    /// or insert a fresh row with heartbeat 0 and a store-assigned id
    async fn checkin(&self, registration: &Registration) -> Result<()>;

    /// Remove a member row; succeeds when the row is already gone
    async fn delete(&self, identity: &str) -> Result<()>;

    /// For each entry, set the member's assigned slot and clear its
    /// requested slot. Entries are written independently, not atomically;
    /// an entry whose row has vanished is skipped.
    async fn persist_assignments(&self, assignments: &BTreeMap<u16, Member>) -> Result<()>;
}

/// Type alias for dynamic registry
pub type DynRegistry = dyn MemberRegistry;
