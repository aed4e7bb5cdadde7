use rosterd_core::{Result, RosterError};
use std::path::Path;
use uuid::Uuid;

/// Load the node identity, generating and persisting a fresh one on first
/// start.
///
/// The identity is reused across restarts so a restarting node reclaims its
/// registry row instead of leaving an orphan behind for the missed-heartbeat
/// eviction to clean up.
pub fn load_or_create(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(existing) => {
            let trimmed = existing.trim();
            if trimmed.is_empty() {
                return Err(RosterError::Config(format!(
                    "identity file {} is empty; delete it to generate a new identity",
                    path.display()
                )));
            }
            Ok(trimmed.to_string())
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            let identity = Uuid::new_v4().to_string();

            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &identity)?;

            tracing::info!("Generated node identity {} at {}", identity, path.display());
            Ok(identity)
        }
        Err(error) => Err(error.into()),
    }
}
