use crate::{Error, Result};
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for an audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Frame size in milliseconds (affects stop-condition latency)
    pub frame_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_duration_ms: 100,
        }
    }
}

/// Microphone capture seam
///
/// A backend is the exclusive owner of the underlying audio device while
/// capturing. The controller hands the backend to whichever subsystem is
/// active; it is never shared between two consumers.
#[async_trait::async_trait]
pub trait AudioBackend: Send + std::fmt::Debug {
    /// Acquire the device and start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The
    /// channel closing before `stop` is called means the device was lost.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source selection
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Platform microphone (not wired up in this build)
    Microphone,
    /// Scripted in-process source (tests, demos, CI)
    Synthetic(super::synthetic::FrameScript),
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create an audio backend for the given source
    pub fn create(
        source: AudioSource,
        config: AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Synthetic(script) => Ok(Box::new(
                super::synthetic::SyntheticBackend::new(script, config),
            )),
            AudioSource::Microphone => Err(Error::Device(
                "platform microphone capture is not available in this build".to_string(),
            )),
        }
    }
}
