use crate::audio::{AudioArtifact, StopReason};
use crate::location::{Location, LocationProvider};
use crate::store::NotificationStore;
use crate::Result;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Bounded wait for a location fix before submitting without one
pub const LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Transcription stored when no usable transcript was captured
pub const NO_TRANSCRIPTION: &str = "No transcription available";

/// An emergency alert record, created once per finished capture session.
/// Immutable to this pipeline after creation; the volunteer dashboard owns
/// the responded fields from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Captured audio, base64-encoded for document storage
    pub audio_base64: String,
    pub audio_mime_type: String,
    /// Original (pre-encoding) audio size in bytes
    pub audio_size: usize,
    pub duration_ms: u64,
    pub stop_reason: StopReason,
    pub transcription: String,
    pub location: Option<Location>,
    pub responded: bool,
    pub responded_at: Option<DateTime<Utc>>,
    pub responder_id: Option<String>,
}

impl Incident {
    /// Build an incident from a finished artifact
    pub fn from_artifact(
        artifact: &AudioArtifact,
        transcript: &str,
        location: Option<Location>,
        user_id: &str,
    ) -> Self {
        let transcription = if transcript.trim().is_empty() {
            NO_TRANSCRIPTION.to_string()
        } else {
            transcript.to_string()
        };

        Self {
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            audio_base64: base64::engine::general_purpose::STANDARD.encode(&artifact.bytes),
            audio_mime_type: artifact.mime_type.clone(),
            audio_size: artifact.bytes.len(),
            duration_ms: artifact.duration_ms,
            stop_reason: artifact.stop_reason,
            transcription,
            location,
            responded: false,
            responded_at: None,
            responder_id: None,
        }
    }
}

/// Packages finished recordings into incidents and submits them
///
/// Submission is best-effort: a rejected create is logged and swallowed so
/// that losing one incident can never prevent future triggers.
pub struct IncidentAssembler {
    store: Arc<dyn NotificationStore>,
    location: Arc<dyn LocationProvider>,
    location_timeout: Duration,
}

impl IncidentAssembler {
    pub fn new(store: Arc<dyn NotificationStore>, location: Arc<dyn LocationProvider>) -> Self {
        Self {
            store,
            location,
            location_timeout: LOCATION_TIMEOUT,
        }
    }

    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout = timeout;
        self
    }

    /// Resolve location with a bounded wait, build the incident, and hand it
    /// to the notification store. Returns the created id on success.
    pub async fn submit(
        &self,
        artifact: AudioArtifact,
        transcript: &str,
        user_id: &str,
    ) -> Result<String> {
        let location = self.resolve_location().await;

        let incident = Incident::from_artifact(&artifact, transcript, location, user_id);

        let id = self.store.create(incident).await?;
        info!("incident submitted: {}", id);
        Ok(id)
    }

    async fn resolve_location(&self) -> Option<Location> {
        match tokio::time::timeout(
            self.location_timeout,
            self.location.current_position(true),
        )
        .await
        {
            Ok(Ok(location)) => Some(location),
            Ok(Err(e)) => {
                warn!("location unavailable, submitting without it: {}", e);
                None
            }
            Err(_) => {
                warn!(
                    "location lookup timed out after {:?}, submitting without it",
                    self.location_timeout
                );
                None
            }
        }
    }
}
