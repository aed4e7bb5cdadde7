//! Downstream publication of the agreed membership ordering
//!
//! Publishers receive the slot-ordered view every cycle and are expected to
//! be idempotent: each one diffs against what it last applied and
//! reconfigures only on change, treating every call as an
//! eventually-consistent upsert rather than a one-shot transition.

pub mod ensemble;
pub mod member_list;

use crate::error::Result;
use crate::liveness::SeenRecord;
use crate::member::Member;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

/// Slot-ordered snapshot of the membership, unassigned slots omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipView {
    pub cluster_size: u16,
    pub slots: BTreeMap<u16, Member>,
}

impl MembershipView {
    pub fn from_tracked(tracked: &HashMap<String, SeenRecord>, cluster_size: u16) -> Self {
        let slots = tracked
            .values()
            .map(|record| record.member())
            .filter(|member| member.is_assigned())
            .map(|member| (member.assigned_slot, member.clone()))
            .collect();

        Self {
            cluster_size,
            slots,
        }
    }

    /// The slot this identity currently occupies, if any.
    pub fn slot_of(&self, identity: &str) -> Option<u16> {
        self.slots
            .iter()
            .find(|(_, member)| member.identity == identity)
            .map(|(slot, _)| *slot)
    }

    /// One address per slot in 1..=cluster_size, empty for unfilled slots.
    pub fn addresses_padded(&self) -> Vec<String> {
        (1..=self.cluster_size)
            .map(|slot| {
                self.slots
                    .get(&slot)
                    .map(|member| member.address.clone())
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Addresses of filled slots only, in slot order.
    pub fn addresses(&self) -> Vec<String> {
        self.slots
            .values()
            .map(|member| member.address.clone())
            .collect()
    }
}

/// A downstream consumer of the ordered membership view
#[async_trait]
pub trait DownstreamPublisher: Send + Sync {
    /// Name used in error reports and logs
    fn name(&self) -> &str;

    /// Reconcile the downstream system with the given view
    async fn apply(&mut self, view: &MembershipView) -> Result<()>;
}
