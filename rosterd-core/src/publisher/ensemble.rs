use super::{DownstreamPublisher, MembershipView};
use crate::error::Result;
use async_trait::async_trait;

/// Reconfigures the coordination ensemble when slot occupancy changes.
///
/// The ensemble wants one entry per slot whether or not the slot is filled,
/// so the roster is padded with empty addresses. The publisher also keeps
/// track of which slot this node itself occupies, since the ensemble member
/// on this host is configured with its own slot number.
pub struct EnsemblePublisher {
    self_identity: String,
    own_slot: u16,
    last_applied: Option<Vec<String>>,
}

impl EnsemblePublisher {
    pub fn new(self_identity: impl Into<String>) -> Self {
        Self {
            self_identity: self_identity.into(),
            own_slot: 0,
            last_applied: None,
        }
    }

    /// Slot of this node in the last applied view, 0 while unassigned.
    pub fn own_slot(&self) -> u16 {
        self.own_slot
    }
}

#[async_trait]
impl DownstreamPublisher for EnsemblePublisher {
    fn name(&self) -> &str {
        "ensemble"
    }

    async fn apply(&mut self, view: &MembershipView) -> Result<()> {
        let roster = view.addresses_padded();
        self.own_slot = view.slot_of(&self.self_identity).unwrap_or(0);

        if self.last_applied.as_ref() == Some(&roster) {
            return Ok(());
        }

        tracing::info!(
            "Ensemble roster changed: {:?} (own slot {})",
            roster,
            self.own_slot
        );
        self.last_applied = Some(roster);

        Ok(())
    }
}
