use super::{DownstreamPublisher, MembershipView};
use crate::error::Result;
use async_trait::async_trait;

/// Publishes the comma-joined address list of filled slots, in slot order.
pub struct MemberListPublisher {
    last_applied: Option<String>,
}

impl MemberListPublisher {
    pub fn new() -> Self {
        Self { last_applied: None }
    }
}

impl Default for MemberListPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DownstreamPublisher for MemberListPublisher {
    fn name(&self) -> &str {
        "member-list"
    }

    async fn apply(&mut self, view: &MembershipView) -> Result<()> {
        let member_list = view.addresses().join(",");

        if self.last_applied.as_deref() == Some(member_list.as_str()) {
            return Ok(());
        }

        tracing::info!("Member list changed: {}", member_list);
        self.last_applied = Some(member_list);

        Ok(())
    }
}
