// Durable storage for the visit ledger
use std::path::PathBuf;

use crate::domain::analytics::VisitLedger;

/// Single-record JSON file, read once at startup and overwritten wholesale
/// on each flush. Callers serialize writes via the analytics service lock.
pub struct AnalyticsStore {
    path: PathBuf,
}

impl AnalyticsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The persisted ledger. Missing or corrupt storage yields the zero
    /// ledger; analytics state never prevents startup.
    pub async fn load(&self) -> VisitLedger {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(_) => return VisitLedger::default(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(ledger) => ledger,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %err,
                    "corrupt analytics state, starting from zero"
                );
                VisitLedger::default()
            }
        }
    }

    /// Overwrite the stored ledger wholesale.
    pub async fn save(&self, ledger: &VisitLedger) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(ledger)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}
