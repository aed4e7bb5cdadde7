use crate::assignment;
use crate::election;
use crate::error::{Result, RosterError};
use crate::liveness::LivenessTracker;
use crate::member::Registration;
use crate::publisher::{DownstreamPublisher, MembershipView};
use crate::registry::DynRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Timings and sizing for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Number of slots, fixed for the life of the cluster.
    pub cluster_size: u16,
    /// Pause between reconciliation cycles.
    pub poll_interval: Duration,
    /// Period of the independent heartbeat emitter.
    pub heartbeat_interval: Duration,
    /// Consecutive cycles without a heartbeat change before eviction.
    pub miss_threshold: u32,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            cluster_size: 3,
            poll_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(5),
            miss_threshold: 3,
        }
    }
}

/// Drives the membership control loop for one node.
///
/// Two independent tasks run per process: the heartbeat emitter and the
/// reconciliation loop. They share nothing in-process; the registry is
/// their only meeting point.
pub struct ClusterManager {
    settings: ManagerSettings,
    registration: Registration,
    registry: Arc<DynRegistry>,
    publishers: Vec<Box<dyn DownstreamPublisher>>,
    liveness: LivenessTracker,
    is_leader: bool,
}

impl ClusterManager {
    pub fn new(
        settings: ManagerSettings,
        registration: Registration,
        registry: Arc<DynRegistry>,
        publishers: Vec<Box<dyn DownstreamPublisher>>,
    ) -> Self {
        Self {
            settings,
            registration,
            registry,
            publishers,
            liveness: LivenessTracker::new(),
            is_leader: false,
        }
    }

    /// One reconciliation cycle.
    ///
    /// Returns true when the leader changed slot assignments, in which case
    /// the caller re-polls immediately instead of publishing a view it just
    /// invalidated.
    pub async fn tick(&mut self) -> Result<bool> {
        self.liveness.refresh(self.registry.as_ref()).await?;
        self.liveness
            .evict(self.registry.as_ref(), self.settings.miss_threshold)
            .await;

        let leading = election::is_leader(&self.registration.identity, self.liveness.tracked());
        if leading != self.is_leader {
            tracing::info!("Currently leader: {}", leading);
        }
        self.is_leader = leading;

        if leading {
            let plan = assignment::resolve(self.liveness.tracked(), self.settings.cluster_size);
            if plan.changed {
                self.registry
                    .persist_assignments(&plan.by_slot)
                    .await
                    .map_err(|error| RosterError::AssignmentPersist(error.to_string()))?;
                return Ok(true);
            }
        }

        let view = MembershipView::from_tracked(self.liveness.tracked(), self.settings.cluster_size);
        for publisher in &mut self.publishers {
            if let Err(error) = publisher.apply(&view).await {
                return Err(RosterError::Publisher {
                    publisher: publisher.name().to_string(),
                    message: error.to_string(),
                });
            }
        }

        Ok(false)
    }

    /// Run the heartbeat emitter and the reconciliation loop until either
    /// fails. The caller is expected to treat an error as fatal and exit,
    /// leaving a restart to the supervisor.
    pub async fn run(mut self) -> Result<()> {
        self.registry.checkin(&self.registration).await?;

        let mut heartbeat = tokio::spawn(heartbeat_loop(
            Arc::clone(&self.registry),
            self.registration.clone(),
            self.settings.heartbeat_interval,
        ));

        let result = tokio::select! {
            joined = &mut heartbeat => match joined {
                Ok(result) => result,
                Err(error) => Err(RosterError::Store(format!(
                    "heartbeat task failed: {}",
                    error
                ))),
            },
            result = self.reconcile_loop() => result,
        };

        heartbeat.abort();
        result
    }

    async fn reconcile_loop(&mut self) -> Result<()> {
        loop {
            if self.tick().await? {
                continue;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

async fn heartbeat_loop(
    registry: Arc<DynRegistry>,
    registration: Registration,
    period: Duration,
) -> Result<()> {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        registry.checkin(&registration).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Member;
    use crate::registry::memory::MemoryRegistry;
    use crate::registry::MemberRegistry;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn registration(identity: &str, requested_slot: u16) -> Registration {
        Registration {
            identity: identity.to_string(),
            name: format!("host-{}", identity),
            address: format!("10.0.0.{}:9200", identity.len()),
            requested_slot,
        }
    }

    fn settings(cluster_size: u16) -> ManagerSettings {
        ManagerSettings {
            cluster_size,
            ..ManagerSettings::default()
        }
    }

    struct RecordingPublisher {
        applied: Arc<Mutex<Vec<MembershipView>>>,
    }

    #[async_trait]
    impl DownstreamPublisher for RecordingPublisher {
        fn name(&self) -> &str {
            "recording"
        }

        async fn apply(&mut self, view: &MembershipView) -> Result<()> {
            self.applied.lock().unwrap().push(view.clone());
            Ok(())
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl DownstreamPublisher for FailingPublisher {
        fn name(&self) -> &str {
            "failing"
        }

        async fn apply(&mut self, _view: &MembershipView) -> Result<()> {
            Err(RosterError::Store("downstream unreachable".to_string()))
        }
    }

    fn manager_for(
        identity: &str,
        registry: &Arc<MemoryRegistry>,
        cluster_size: u16,
    ) -> (ClusterManager, Arc<Mutex<Vec<MembershipView>>>) {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let manager = ClusterManager::new(
            settings(cluster_size),
            registration(identity, 0),
            Arc::clone(registry) as Arc<DynRegistry>,
            vec![Box::new(RecordingPublisher {
                applied: Arc::clone(&applied),
            })],
        );
        (manager, applied)
    }

    fn assigned_slots(members: &[Member]) -> HashSet<u16> {
        members
            .iter()
            .filter(|member| member.is_assigned())
            .map(|member| member.assigned_slot)
            .collect()
    }

    #[tokio::test]
    async fn test_leader_assigns_then_publishes_on_next_cycle() {
        let registry = Arc::new(MemoryRegistry::new());
        for identity in ["a", "b", "c"] {
            registry.checkin(&registration(identity, 0)).await.unwrap();
        }

        let (mut manager, applied) = manager_for("a", &registry, 3);

        // Assignment changed: the cycle short-circuits before publication.
        assert!(manager.tick().await.unwrap());
        assert!(applied.lock().unwrap().is_empty());

        // Nothing left to assign: the settled view goes downstream.
        assert!(!manager.tick().await.unwrap());

        let views = applied.lock().unwrap();
        assert_eq!(views.len(), 1);
        let slots: HashSet<u16> = views[0].slots.keys().copied().collect();
        assert_eq!(slots, HashSet::from([1, 2, 3]));

        let members = registry.list().await.unwrap();
        assert_eq!(assigned_slots(&members), HashSet::from([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_settled_cluster_stays_settled() {
        let registry = Arc::new(MemoryRegistry::new());
        for identity in ["a", "b", "c"] {
            registry.checkin(&registration(identity, 0)).await.unwrap();
        }

        let (mut manager, _applied) = manager_for("a", &registry, 3);
        assert!(manager.tick().await.unwrap());
        assert!(!manager.tick().await.unwrap());

        let before = registry.list().await.unwrap();
        assert!(!manager.tick().await.unwrap());
        let after = registry.list().await.unwrap();

        // Heartbeats are stuck in this test, but assignments must not move.
        let slots_before: Vec<(i64, u16)> =
            before.iter().map(|m| (m.id, m.assigned_slot)).collect();
        let slots_after: Vec<(i64, u16)> =
            after.iter().map(|m| (m.id, m.assigned_slot)).collect();
        assert_eq!(slots_before, slots_after);
    }

    #[tokio::test]
    async fn test_non_leader_never_assigns() {
        let registry = Arc::new(MemoryRegistry::new());
        for identity in ["a", "b"] {
            registry.checkin(&registration(identity, 0)).await.unwrap();
        }

        // "b" has the larger id and must not resolve slots.
        let (mut manager, applied) = manager_for("b", &registry, 3);
        assert!(!manager.tick().await.unwrap());

        let members = registry.list().await.unwrap();
        assert!(assigned_slots(&members).is_empty());

        // The unassigned view is still published downstream.
        assert_eq!(applied.lock().unwrap().len(), 1);
        assert!(applied.lock().unwrap()[0].slots.is_empty());
    }

    #[tokio::test]
    async fn test_late_joiner_claims_requested_free_slot() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.checkin(&registration("a", 0)).await.unwrap();

        let (mut manager, _applied) = manager_for("a", &registry, 3);
        assert!(manager.tick().await.unwrap());
        assert!(!manager.tick().await.unwrap());

        // Slot 2 is free; a newcomer asking for it must get exactly it.
        registry.checkin(&registration("d", 2)).await.unwrap();
        registry.checkin(&registration("a", 0)).await.unwrap();
        assert!(manager.tick().await.unwrap());
        registry.checkin(&registration("a", 0)).await.unwrap();
        assert!(!manager.tick().await.unwrap());

        let members = registry.list().await.unwrap();
        let holder = members
            .iter()
            .find(|member| member.assigned_slot == 2)
            .unwrap();
        assert_eq!(holder.identity, "d");
        assert_eq!(holder.requested_slot, 0);

        let a = members.iter().find(|m| m.identity == "a").unwrap();
        assert_eq!(a.assigned_slot, 1);
    }

    #[tokio::test]
    async fn test_stale_member_is_evicted_and_slot_reclaimed() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.checkin(&registration("a", 0)).await.unwrap();
        registry.checkin(&registration("b", 0)).await.unwrap();

        let (mut manager, _applied) = manager_for("a", &registry, 2);
        assert!(manager.tick().await.unwrap());
        assert!(!manager.tick().await.unwrap());

        let members = registry.list().await.unwrap();
        let b_slot = members
            .iter()
            .find(|member| member.identity == "b")
            .unwrap()
            .assigned_slot;
        assert!(b_slot > 0);

        // "a" keeps heartbeating while "b" goes silent until eviction.
        loop {
            registry.checkin(&registration("a", 0)).await.unwrap();
            manager.tick().await.unwrap();
            let members = registry.list().await.unwrap();
            if !members.iter().any(|member| member.identity == "b") {
                break;
            }
        }

        // A newcomer inherits the freed slot.
        registry.checkin(&registration("c", 0)).await.unwrap();
        registry.checkin(&registration("a", 0)).await.unwrap();
        assert!(manager.tick().await.unwrap());

        let members = registry.list().await.unwrap();
        let c = members.iter().find(|m| m.identity == "c").unwrap();
        assert_eq!(c.assigned_slot, b_slot);
    }

    #[tokio::test]
    async fn test_publisher_failure_is_fatal_for_the_cycle() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.checkin(&registration("a", 0)).await.unwrap();

        let mut manager = ClusterManager::new(
            settings(3),
            registration("a", 0),
            Arc::clone(&registry) as Arc<DynRegistry>,
            vec![Box::new(FailingPublisher)],
        );

        assert!(manager.tick().await.unwrap());
        let error = manager.tick().await.unwrap_err();
        assert!(matches!(error, RosterError::Publisher { .. }));
    }
}
