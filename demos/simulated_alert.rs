//! End-to-end simulated alert
//!
//! Runs the full pipeline against scripted recognition and synthetic audio:
//! the phrase "i need help" triggers a recording that ends on the silence
//! timeout, and the resulting incident lands in an in-process store.
//!
//! Run with: cargo run --example simulated_alert

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use voice_sos::config::{CaptureSettings, VoiceConfig};
use voice_sos::incident::IncidentAssembler;
use voice_sos::location::{FixedLocationProvider, Location};
use voice_sos::recognition::{FragmentScript, ScriptedRecognizer};
use voice_sos::store::{LocalStore, NotificationStore};
use voice_sos::{
    AudioSource, FrameScript, ScriptSegment, VoiceActivationController,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let store = Arc::new(LocalStore::new());
    let location = Arc::new(FixedLocationProvider::new(Location {
        lat: 37.7793,
        lng: -122.4193,
        formatted: "San Francisco, CA".to_string(),
    }));
    let assembler = Arc::new(IncidentAssembler::new(store.clone(), location));

    // what the user says, as the recognizer would deliver it
    let speech = FragmentScript::fragments(["I", "I need", "I need help"]);

    // one second of shouting, then silence until the window trips
    let audio = FrameScript {
        segments: vec![
            ScriptSegment {
                duration_ms: 1_000,
                amplitude: 12_000,
            },
            ScriptSegment {
                duration_ms: 16_000,
                amplitude: 10,
            },
        ],
        then_silence: true,
        ..Default::default()
    };

    let (controller, task) = VoiceActivationController::spawn(
        &VoiceConfig::default(),
        CaptureSettings::default(),
        Box::new(ScriptedRecognizer::new(speech)),
        AudioSource::Synthetic(audio),
        assembler,
        "demo-user".to_string(),
    );

    let mut feed = store.subscribe().await;
    controller.start().await?;
    info!("listening for trigger phrases...");

    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if !feed.borrow_and_update().is_empty() {
                return;
            }
            feed.changed().await.expect("store closed");
        }
    })
    .await
    .expect("no incident arrived");

    let snapshot = feed.borrow().clone();
    let incident = &snapshot[0].incident;
    info!("incident {} stored", snapshot[0].id);
    info!("  user: {}", incident.user_id);
    info!("  transcript: {}", incident.transcription);
    info!("  stopped: {:?} after {}ms", incident.stop_reason, incident.duration_ms);
    info!("  audio: {} bytes ({})", incident.audio_size, incident.audio_mime_type);
    if let Some(loc) = &incident.location {
        info!("  location: {} ({}, {})", loc.formatted, loc.lat, loc.lng);
    }

    controller.shutdown(task).await?;
    Ok(())
}
