use super::{IncidentPatch, NotificationStore, StoredIncident};
use crate::incident::Incident;
use crate::{Error, Result};
use std::path::PathBuf;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

/// Audio payload limit per stored incident document
///
/// Base64 encoding adds ~33%, so this keeps documents under the 1MB limit
/// typical of document stores.
pub const MAX_AUDIO_BYTES: usize = 750 * 1024;

/// In-process notification store with optional JSON-file persistence
///
/// The local analogue of the document store the production deployment
/// talks to; the file doubles as a durable fallback the way the original
/// kept incidents in browser storage.
pub struct LocalStore {
    incidents: Mutex<Vec<StoredIncident>>,
    snapshot_tx: watch::Sender<Vec<StoredIncident>>,
    persist_path: Option<PathBuf>,
}

impl LocalStore {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        Self {
            incidents: Mutex::new(Vec::new()),
            snapshot_tx,
            persist_path: None,
        }
    }

    /// Open a store persisted to a JSON file, loading any existing incidents
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let incidents: Vec<StoredIncident> = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            Vec::new()
        };

        info!(
            "local store opened: {} ({} incidents)",
            path.display(),
            incidents.len()
        );

        let (snapshot_tx, _) = watch::channel(incidents.clone());
        Ok(Self {
            incidents: Mutex::new(incidents),
            snapshot_tx,
            persist_path: Some(path),
        })
    }

    fn persist(&self, incidents: &[StoredIncident]) {
        if let Some(path) = &self.persist_path {
            match serde_json::to_string_pretty(incidents) {
                Ok(json) => {
                    if let Err(e) = std::fs::write(path, json) {
                        warn!("failed to persist incidents to {}: {}", path.display(), e);
                    }
                }
                Err(e) => warn!("failed to serialize incidents: {}", e),
            }
        }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NotificationStore for LocalStore {
    async fn create(&self, incident: Incident) -> Result<String> {
        if incident.audio_size > MAX_AUDIO_BYTES {
            return Err(Error::Submission(format!(
                "audio payload too large: {} bytes (limit {})",
                incident.audio_size, MAX_AUDIO_BYTES
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let stored = StoredIncident {
            id: id.clone(),
            incident,
        };

        let mut incidents = self.incidents.lock().await;
        // newest-first ordering for subscribers
        incidents.insert(0, stored);
        self.persist(&incidents);
        let _ = self.snapshot_tx.send(incidents.clone());

        info!("incident stored: {}", id);
        Ok(id)
    }

    async fn subscribe(&self) -> watch::Receiver<Vec<StoredIncident>> {
        self.snapshot_tx.subscribe()
    }

    async fn update(&self, id: &str, patch: IncidentPatch) -> Result<()> {
        let mut incidents = self.incidents.lock().await;

        let entry = incidents
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or_else(|| Error::Submission(format!("no incident with id {}", id)))?;

        entry.incident.responded = patch.responded;
        entry.incident.responded_at = patch.responded_at;
        entry.incident.responder_id = patch.responder_id;

        self.persist(&incidents);
        let _ = self.snapshot_tx.send(incidents.clone());
        Ok(())
    }
}
