use crate::error::Result;
use crate::member::Member;
use crate::registry::DynRegistry;
use std::collections::HashMap;

/// Local bookkeeping for one registry row.
///
/// Owned exclusively by the reconciliation loop; the member snapshot inside
/// is replaced from the registry every cycle and never trusted once a
/// fresher read is available.
#[derive(Debug, Clone)]
pub struct SeenRecord {
    member: Member,
    heartbeat: u64,
    missed: u32,
}

impl SeenRecord {
    pub(crate) fn new(member: Member) -> Self {
        let heartbeat = member.heartbeat;
        Self {
            member,
            heartbeat,
            missed: 0,
        }
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }
}

/// Tracks which members exist and how stale each one is.
#[derive(Debug, Default)]
pub struct LivenessTracker {
    records: HashMap<String, SeenRecord>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked(&self) -> &HashMap<String, SeenRecord> {
        &self.records
    }

    /// Age every tracked record, then merge a fresh registry listing.
    ///
    /// Aging happens before the merge so a member absent from one listing
    /// keeps accruing misses instead of silently disappearing; it only goes
    /// away through an explicit eviction.
    pub async fn refresh(&mut self, registry: &DynRegistry) -> Result<()> {
        for record in self.records.values_mut() {
            record.missed += 1;
        }

        for member in registry.list().await? {
            match self.records.get_mut(&member.identity) {
                Some(record) => {
                    if record.heartbeat != member.heartbeat {
                        record.heartbeat = member.heartbeat;
                        record.missed = 0;
                    }
                    record.member = member;
                }
                None => {
                    self.records
                        .insert(member.identity.clone(), SeenRecord::new(member));
                }
            }
        }

        Ok(())
    }

    /// Delete every member that has reached the missed-heartbeat threshold.
    ///
    /// A record is forgotten only once the registry delete succeeds; a
    /// failed delete keeps it tracked so eviction is retried next cycle.
    pub async fn evict(&mut self, registry: &DynRegistry, threshold: u32) {
        let stale: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| record.missed >= threshold)
            .map(|(identity, _)| identity.clone())
            .collect();

        for identity in stale {
            let member = self.records[&identity].member.clone();
            tracing::info!(
                "Forgetting cluster member {} ({})",
                member.identity,
                member.address
            );

            match registry.delete(&identity).await {
                Ok(()) => {
                    self.records.remove(&identity);
                }
                Err(error) => {
                    tracing::error!(
                        "Failed to delete member {}: {}",
                        member.identity,
                        error
                    );
                }
            }
        }
    }
}
