use crate::liveness::SeenRecord;
use crate::member::Member;
use std::collections::{BTreeMap, HashMap};

/// Outcome of one slot-resolution pass.
#[derive(Debug, Clone)]
pub struct SlotPlan {
    /// Full slot map after resolution, keyed by slot number.
    pub by_slot: BTreeMap<u16, Member>,
    /// Whether any member newly received a slot.
    pub changed: bool,
}

/// Resolve unassigned members onto free slots.
///
/// Members already holding a slot keep it. The unassigned members are
/// visited in id order: a free requested slot inside the cluster range is
/// honored first, so a restarting node can reclaim the slot it held before;
/// every slot in 1..=cluster_size still empty afterwards is filled from the
/// remaining pool, lowest id first. `changed` reports whether the plan
/// differs from the starting state; persisting it is the caller's decision.
pub fn resolve(tracked: &HashMap<String, SeenRecord>, cluster_size: u16) -> SlotPlan {
    let mut by_slot: BTreeMap<u16, Member> = BTreeMap::new();
    let mut unassigned: Vec<Member> = Vec::new();

    for record in tracked.values() {
        let member = record.member().clone();
        if member.is_assigned() {
            by_slot.insert(member.assigned_slot, member);
        } else {
            unassigned.push(member);
        }
    }
    unassigned.sort_by_key(|member| member.id);

    let mut changed = false;

    // Honor requested slots first.
    let mut pool: Vec<Member> = Vec::new();
    for member in unassigned {
        let requested = member.requested_slot;
        if requested == 0 || requested > cluster_size || by_slot.contains_key(&requested) {
            pool.push(member);
            continue;
        }

        tracing::info!(
            "Assigning {} {} to slot {} by request",
            member.identity,
            member.address,
            requested
        );
        let mut claimed = member;
        claimed.assigned_slot = requested;
        by_slot.insert(requested, claimed);
        changed = true;
    }

    // Fill every slot still empty from the remaining pool.
    let mut pool = pool.into_iter();
    for slot in 1..=cluster_size {
        if by_slot.contains_key(&slot) {
            continue;
        }

        let Some(member) = pool.next() else {
            break;
        };

        tracing::info!(
            "Assigning {} {} to slot {}",
            member.identity,
            member.address,
            slot
        );
        let mut claimed = member;
        claimed.assigned_slot = slot;
        by_slot.insert(slot, claimed);
        changed = true;
    }

    SlotPlan { by_slot, changed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn member(id: i64, requested_slot: u16, assigned_slot: u16) -> Member {
        Member {
            id,
            identity: format!("node-{}", id),
            name: String::new(),
            address: format!("10.0.0.{}:9200", id),
            requested_slot,
            heartbeat: 0,
            assigned_slot,
        }
    }

    fn tracked(members: Vec<Member>) -> HashMap<String, SeenRecord> {
        members
            .into_iter()
            .map(|member| (member.identity.clone(), SeenRecord::new(member)))
            .collect()
    }

    #[test]
    fn test_fill_covers_every_slot_exactly_once() {
        let view = tracked(vec![member(1, 0, 0), member(2, 0, 0), member(3, 0, 0)]);

        let plan = resolve(&view, 3);

        assert!(plan.changed);
        let slots: HashSet<u16> = plan.by_slot.keys().copied().collect();
        assert_eq!(slots, HashSet::from([1, 2, 3]));

        let holders: HashSet<&str> = plan
            .by_slot
            .values()
            .map(|member| member.identity.as_str())
            .collect();
        assert_eq!(holders.len(), 3);
    }

    #[test]
    fn test_resolution_is_stable_once_persisted() {
        let view = tracked(vec![member(1, 0, 0), member(2, 0, 0), member(3, 0, 0)]);
        let first = resolve(&view, 3);
        assert!(first.changed);

        // Re-resolve against the state the first plan produced.
        let settled = tracked(first.by_slot.values().cloned().collect());
        let second = resolve(&settled, 3);

        assert!(!second.changed);
        assert_eq!(second.by_slot, first.by_slot);
    }

    #[test]
    fn test_free_requested_slot_is_honored() {
        let view = tracked(vec![
            member(1, 0, 1),
            member(3, 0, 3),
            member(4, 2, 0),
        ]);

        let plan = resolve(&view, 3);

        assert!(plan.changed);
        assert_eq!(plan.by_slot[&2].identity, "node-4");
        assert_eq!(plan.by_slot[&1].identity, "node-1");
        assert_eq!(plan.by_slot[&3].identity, "node-3");
    }

    #[test]
    fn test_occupied_requested_slot_falls_back_to_fill() {
        let view = tracked(vec![member(1, 0, 2), member(2, 2, 0)]);

        let plan = resolve(&view, 3);

        assert!(plan.changed);
        assert_eq!(plan.by_slot[&2].identity, "node-1");
        assert_eq!(plan.by_slot[&1].identity, "node-2");
    }

    #[test]
    fn test_request_outside_cluster_range_is_ignored() {
        let view = tracked(vec![member(1, 9, 0)]);

        let plan = resolve(&view, 3);

        assert!(plan.changed);
        assert_eq!(plan.by_slot[&1].identity, "node-1");
        assert_eq!(plan.by_slot.len(), 1);
    }

    #[test]
    fn test_surplus_members_stay_unassigned() {
        let view = tracked(vec![
            member(1, 0, 0),
            member(2, 0, 0),
            member(3, 0, 0),
            member(4, 0, 0),
        ]);

        let plan = resolve(&view, 3);

        assert_eq!(plan.by_slot.len(), 3);
        let slots: Vec<u16> = plan.by_slot.keys().copied().collect();
        assert_eq!(slots, vec![1, 2, 3]);
        // Lowest ids win the fill pass.
        assert_eq!(plan.by_slot[&1].identity, "node-1");
        assert_eq!(plan.by_slot[&3].identity, "node-3");
    }

    #[test]
    fn test_assigned_slots_are_pairwise_distinct_and_bounded() {
        let view = tracked(vec![
            member(1, 2, 0),
            member(2, 2, 0),
            member(3, 0, 1),
            member(4, 0, 0),
            member(5, 7, 0),
        ]);

        let plan = resolve(&view, 4);

        let mut seen = HashSet::new();
        for (slot, holder) in &plan.by_slot {
            assert!(*slot >= 1 && *slot <= 4);
            assert_eq!(*slot, holder.assigned_slot);
            assert!(seen.insert(*slot));
        }
    }

    #[test]
    fn test_empty_view_changes_nothing() {
        let plan = resolve(&tracked(vec![]), 3);
        assert!(!plan.changed);
        assert!(plan.by_slot.is_empty());
    }
}
