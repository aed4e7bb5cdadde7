use crate::liveness::SeenRecord;
use crate::member::Member;
use std::collections::HashMap;

/// The tracked member with the smallest store-assigned id, if any.
pub fn leader(tracked: &HashMap<String, SeenRecord>) -> Option<&Member> {
    tracked
        .values()
        .map(|record| record.member())
        .min_by_key(|member| member.id)
}

/// A node leads iff its own row is the smallest-id member of its view.
///
/// Each node evaluates this against its own polled snapshot, so two nodes
/// can briefly disagree during a topology change; the assignment pass is
/// idempotent and converges on a later cycle. A node that does not see
/// itself in the tracked set is never leader.
pub fn is_leader(self_identity: &str, tracked: &HashMap<String, SeenRecord>) -> bool {
    leader(tracked).is_some_and(|member| member.identity == self_identity)
}
