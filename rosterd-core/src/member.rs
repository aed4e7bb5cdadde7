use serde::{Deserialize, Serialize};

/// One registry row describing a cluster participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Store-assigned monotonic identifier; supplies the total order used
    /// for leader election.
    pub id: i64,
    /// Stable token identifying the logical node across process restarts.
    pub identity: String,
    /// Display name reported by the node, informational only.
    pub name: String,
    /// Reachable network address of the node.
    pub address: String,
    /// Slot the node asked for at first registration, 0 for no preference.
    pub requested_slot: u16,
    /// Counter the node itself bumps every liveness interval.
    pub heartbeat: u64,
    /// 0 while unassigned, otherwise a value in 1..=cluster_size.
    pub assigned_slot: u16,
}

impl Member {
    pub fn is_assigned(&self) -> bool {
        self.assigned_slot > 0
    }
}

/// Fields a node supplies about itself when checking in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub identity: String,
    pub name: String,
    pub address: String,
    pub requested_slot: u16,
}
