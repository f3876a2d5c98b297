pub mod audio;
pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod incident;
pub mod location;
pub mod recognition;
pub mod store;

pub use audio::{
    AudioArtifact, AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame,
    AudioLevelMonitor, AudioSource, FrameScript, ScriptSegment, StopReason,
};
pub use capture::CaptureSession;
pub use config::Config;
pub use controller::{
    ControllerStatus, Event, FaultKind, Machine, Phase, VoiceActivationController,
};
pub use error::{Error, Result};
pub use http::{create_router, AppState};
pub use incident::{Incident, IncidentAssembler};
pub use location::{Location, LocationProvider};
pub use recognition::{
    FragmentScript, RecognizerFactory, SpeechRecognizer, TriggerDetector, TriggerMatch,
};
pub use store::{IncidentPatch, LocalStore, NotificationStore, StoredIncident};
