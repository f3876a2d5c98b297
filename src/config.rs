use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub location: Option<LocationConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Recognition engine name. Unknown engines surface as
    /// RecognitionUnsupported when listening starts.
    pub recognizer: String,

    /// Ordered trigger phrase set, matched case-insensitively.
    /// First configured phrase wins when several match.
    pub trigger_phrases: Vec<String>,

    /// Delay before re-entering listening after a finished recording
    /// or a recoverable recognition error (milliseconds).
    pub resume_delay_ms: u64,

    /// Consecutive unrecoverable recognition errors tolerated before
    /// the controller parks in Idle.
    pub max_recognition_errors: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            recognizer: "scripted".to_string(),
            trigger_phrases: default_trigger_phrases(),
            resume_delay_ms: 750, // let the OS release the audio device
            max_recognition_errors: 3,
        }
    }
}

/// Default trigger phrases for voice activation (case-insensitive)
pub fn default_trigger_phrases() -> Vec<String> {
    [
        "help me",
        "help",
        "emergency",
        "i need help",
        "assist me",
        "sos",
        "save me",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Sample rate for captured audio
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Hard cap on a recording session (milliseconds)
    pub max_duration_ms: u64,

    /// Mean amplitude below this (0-255 scale) counts as silence
    pub silence_threshold: f32,

    /// Contiguous silence required to stop recording (milliseconds)
    pub silence_window_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz mono, plenty for speech
            channels: 1,
            max_duration_ms: 30_000,
            silence_threshold: 30.0,
            silence_window_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Optional JSON file the local store persists incidents to
    pub persist_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    pub lat: f64,
    pub lng: f64,
    pub formatted: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
