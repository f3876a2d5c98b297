pub mod scripted;
pub mod trigger;

pub use scripted::{FragmentScript, ScriptedEvent, ScriptedRecognizer};
pub use trigger::{TriggerDetector, TriggerMatch};

use crate::{Error, Result};
use tokio::sync::mpsc;

/// One piece of recognized speech from the continuous stream
#[derive(Debug, Clone)]
pub struct TranscriptFragment {
    pub text: String,
    /// False for interim results; trigger matching considers both
    pub is_final: bool,
}

/// Recognition failure reported by the engine
#[derive(Debug, Clone)]
pub struct RecognitionFault {
    /// Engine error code, e.g. "aborted", "no-speech", "network"
    pub code: String,
    pub message: String,
}

impl RecognitionFault {
    /// Expected faults are silently ignored rather than recovered from
    pub fn is_expected(&self) -> bool {
        matches!(self.code.as_str(), "aborted" | "no-speech")
    }
}

/// Event emitted by a continuous recognition stream
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    Fragment(TranscriptFragment),
    Error(RecognitionFault),
    /// Natural end of stream; the consumer decides whether to restart
    Ended,
}

/// Continuous speech recognition seam
///
/// `begin` starts continuous, interim-inclusive recognition and returns the
/// event stream for one listening episode. `stop` tears the stream down;
/// no events are delivered after it returns.
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send {
    async fn begin(&mut self) -> Result<mpsc::Receiver<RecognitionEvent>>;

    async fn stop(&mut self) -> Result<()>;

    fn name(&self) -> &str;
}

/// Recognition engine selection
///
/// Richer engines (cloud transcription services) are strategies behind the
/// same trait, not a hidden fallback chain; anything not wired up in this
/// build fails fast with `RecognitionUnsupported`.
pub struct RecognizerFactory;

impl RecognizerFactory {
    pub fn create(engine: &str, script: Option<FragmentScript>) -> Box<dyn SpeechRecognizer> {
        match engine {
            "scripted" => Box::new(ScriptedRecognizer::new(script.unwrap_or_default())),
            other => Box::new(UnsupportedRecognizer {
                engine: other.to_string(),
            }),
        }
    }
}

/// Placeholder for engines not present in this build; `begin` always fails
/// so the controller stays Idle and surfaces the limitation.
pub struct UnsupportedRecognizer {
    engine: String,
}

#[async_trait::async_trait]
impl SpeechRecognizer for UnsupportedRecognizer {
    async fn begin(&mut self) -> Result<mpsc::Receiver<RecognitionEvent>> {
        Err(Error::RecognitionUnsupported(self.engine.clone()))
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.engine
    }
}
