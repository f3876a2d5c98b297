use super::{RecognitionEvent, RecognitionFault, SpeechRecognizer, TranscriptFragment};
use crate::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One scripted recognition event with a delay before delivery
#[derive(Debug, Clone)]
pub struct ScriptedEvent {
    pub delay: Duration,
    pub event: RecognitionEvent,
}

/// Replayable script for the scripted recognizer
///
/// Each `begin` replays the script from the top. An empty script keeps the
/// stream open and silent until stopped.
#[derive(Debug, Clone, Default)]
pub struct FragmentScript {
    pub events: Vec<ScriptedEvent>,
}

impl FragmentScript {
    /// Interim fragments delivered in order with a small fixed gap
    pub fn fragments<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: texts
                .into_iter()
                .map(|text| ScriptedEvent {
                    delay: Duration::from_millis(10),
                    event: RecognitionEvent::Fragment(TranscriptFragment {
                        text: text.into(),
                        is_final: false,
                    }),
                })
                .collect(),
        }
    }

    pub fn push_error(mut self, code: &str, message: &str) -> Self {
        self.events.push(ScriptedEvent {
            delay: Duration::from_millis(10),
            event: RecognitionEvent::Error(RecognitionFault {
                code: code.to_string(),
                message: message.to_string(),
            }),
        });
        self
    }

    pub fn push_ended(mut self) -> Self {
        self.events.push(ScriptedEvent {
            delay: Duration::from_millis(10),
            event: RecognitionEvent::Ended,
        });
        self
    }
}

/// Recognition engine that replays a fragment script
///
/// Used by tests, the demo, and simulation runs; real engines implement the
/// same `SpeechRecognizer` trait.
pub struct ScriptedRecognizer {
    script: FragmentScript,
    task: Option<JoinHandle<()>>,
}

impl ScriptedRecognizer {
    pub fn new(script: FragmentScript) -> Self {
        Self { script, task: None }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn begin(&mut self) -> Result<mpsc::Receiver<RecognitionEvent>> {
        // a stale task from a previous episode must not outlive the new one
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let (tx, rx) = mpsc::channel(16);
        let events = self.script.events.clone();

        let task = tokio::spawn(async move {
            for scripted in events {
                tokio::time::sleep(scripted.delay).await;
                if tx.send(scripted.event).await.is_err() {
                    return;
                }
            }
            // keep the channel open; continuous recognition does not end
            // just because the script ran out
            std::future::pending::<()>().await;
        });

        self.task = Some(task);
        debug!("scripted recognizer started");
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("scripted recognizer stopped");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
