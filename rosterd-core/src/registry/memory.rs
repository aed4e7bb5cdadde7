use crate::error::Result;
use crate::member::{Member, Registration};
use crate::registry::MemberRegistry;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// In-process member registry for tests and single-node experiments.
///
/// Behaves like the real store: ids are assigned from a monotonic sequence,
/// checkin bumps the heartbeat of an existing row, delete is idempotent.
#[derive(Default)]
pub struct MemoryRegistry {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: HashMap<String, Member>,
    next_id: i64,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemberRegistry for MemoryRegistry {
    async fn list(&self) -> Result<Vec<Member>> {
        let inner = self.inner.lock().unwrap();
        let mut members: Vec<Member> = inner.rows.values().cloned().collect();
        members.sort_by_key(|member| member.id);
        Ok(members)
    }

    async fn checkin(&self, registration: &Registration) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(row) = inner.rows.get_mut(&registration.identity) {
            row.heartbeat += 1;
            return Ok(());
        }

        inner.next_id += 1;
        let member = Member {
            id: inner.next_id,
            identity: registration.identity.clone(),
            name: registration.name.clone(),
            address: registration.address.clone(),
            requested_slot: registration.requested_slot,
            heartbeat: 0,
            assigned_slot: 0,
        };
        inner.rows.insert(registration.identity.clone(), member);

        Ok(())
    }

    async fn delete(&self, identity: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.rows.remove(identity);
        Ok(())
    }

    async fn persist_assignments(&self, assignments: &BTreeMap<u16, Member>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        for (slot, member) in assignments {
            if let Some(row) = inner.rows.get_mut(&member.identity) {
                row.assigned_slot = *slot;
                row.requested_slot = 0;
            }
        }

        Ok(())
    }
}
