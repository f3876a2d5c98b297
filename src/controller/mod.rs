//! Voice activation controller
//!
//! One actor task owns the whole listen/record/submit lifecycle. Every
//! external input and internal completion becomes an [`Event`] fed to the
//! pure [`Machine`], and the resulting [`Action`]s are executed in order.
//! The phase value is the only re-entrancy guard: nothing else tracks
//! whether a detector or a capture session is live, because the actor's
//! `Active` slot can structurally hold at most one of them.

mod machine;

pub use machine::{Action, Event, FaultKind, Machine, Phase};

use crate::audio::{
    AudioBackendConfig, AudioBackendFactory, AudioSource, StopReason,
};
use crate::capture::CaptureSession;
use crate::config::{CaptureSettings, VoiceConfig};
use crate::incident::IncidentAssembler;
use crate::recognition::{
    RecognitionEvent, SpeechRecognizer, TriggerDetector, TriggerMatch,
};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
enum Command {
    Start,
    Stop,
    ManualToggle,
    Shutdown,
}

/// Snapshot served over HTTP
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub phase: Phase,
    pub fault: Option<FaultKind>,
}

/// Handle to the controller actor
///
/// Cheap to clone; all methods just post commands or read the watch
/// channels the actor publishes to.
#[derive(Clone)]
pub struct VoiceActivationController {
    cmd_tx: mpsc::Sender<Command>,
    phase_rx: watch::Receiver<Phase>,
    fault_rx: watch::Receiver<Option<FaultKind>>,
}

impl VoiceActivationController {
    /// Spawn the actor task and return its handle
    pub fn spawn(
        voice: &VoiceConfig,
        capture: CaptureSettings,
        recognizer: Box<dyn SpeechRecognizer>,
        audio_source: AudioSource,
        assembler: Arc<IncidentAssembler>,
        user_id: String,
    ) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (phase_tx, phase_rx) = watch::channel(Phase::Idle);
        let (fault_tx, fault_rx) = watch::channel(None);

        let actor = Actor {
            machine: Machine::new(voice.max_recognition_errors),
            detector: TriggerDetector::new(voice.trigger_phrases.clone()),
            recognizer,
            audio_source,
            audio_config: AudioBackendConfig {
                sample_rate: capture.sample_rate,
                channels: capture.channels,
                ..AudioBackendConfig::default()
            },
            settings: capture,
            assembler,
            user_id,
            resume_delay: Duration::from_millis(voice.resume_delay_ms),
            cmd_rx,
            phase_tx,
            fault_tx,
            active: Active::Idle,
            pending_match: None,
        };
        let task = tokio::spawn(actor.run());

        (
            Self {
                cmd_tx,
                phase_rx,
                fault_rx,
            },
            task,
        )
    }

    pub async fn start(&self) -> Result<()> {
        self.send(Command::Start).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    /// Skip straight to recording from listening, or force-stop a running
    /// recording
    pub async fn manual_toggle(&self) -> Result<()> {
        self.send(Command::ManualToggle).await
    }

    /// Stop everything and wait for the actor to exit
    pub async fn shutdown(self, task: JoinHandle<()>) -> Result<()> {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
        task.await
            .map_err(|e| Error::Controller(format!("actor task panicked: {e}")))
    }

    pub fn phase(&self) -> Phase {
        *self.phase_rx.borrow()
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            phase: self.phase(),
            fault: *self.fault_rx.borrow(),
        }
    }

    /// Watch phase transitions as they happen
    pub fn watch_phase(&self) -> watch::Receiver<Phase> {
        self.phase_rx.clone()
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| Error::Controller("controller task is not running".to_string()))
    }
}

/// What the actor is currently driving. Holding the recognition stream or
/// the capture session here (and nowhere else) is what makes "at most one
/// subsystem owns the microphone" a structural property.
enum Active {
    Idle,
    Listening { events: mpsc::Receiver<RecognitionEvent> },
    AwaitRetry { at: Instant },
    Recording { session: CaptureSession },
    AwaitResume { at: Instant },
}

enum Step {
    Ev(Event),
    Skip,
    Quit,
}

struct Actor {
    machine: Machine,
    detector: TriggerDetector,
    recognizer: Box<dyn SpeechRecognizer>,
    audio_source: AudioSource,
    audio_config: AudioBackendConfig,
    settings: CaptureSettings,
    assembler: Arc<IncidentAssembler>,
    user_id: String,
    resume_delay: Duration,
    cmd_rx: mpsc::Receiver<Command>,
    phase_tx: watch::Sender<Phase>,
    fault_tx: watch::Sender<Option<FaultKind>>,
    active: Active,
    /// Fragment that triggered the running capture; becomes the incident
    /// transcript
    pending_match: Option<TriggerMatch>,
}

impl Actor {
    async fn run(mut self) {
        loop {
            let step = match &mut self.active {
                Active::Idle => match self.cmd_rx.recv().await {
                    Some(Command::Shutdown) | None => Step::Quit,
                    Some(cmd) => Step::Ev(command_event(cmd)),
                },

                Active::Listening { events } => tokio::select! {
                    cmd = self.cmd_rx.recv() => match cmd {
                        Some(Command::Shutdown) | None => Step::Quit,
                        Some(cmd) => Step::Ev(command_event(cmd)),
                    },
                    recognized = events.recv() => match recognized {
                        Some(RecognitionEvent::Fragment(fragment)) => {
                            self.machine.note_activity();
                            match self.detector.match_fragment(&fragment.text) {
                                Some(matched) => {
                                    info!(
                                        "trigger phrase {:?} matched in {:?}",
                                        matched.matched_phrase, fragment.text
                                    );
                                    self.pending_match = Some(matched);
                                    Step::Ev(Event::TriggerMatched)
                                }
                                None => Step::Skip,
                            }
                        }
                        Some(RecognitionEvent::Error(fault)) => {
                            if fault.is_expected() {
                                debug!("benign recognition error: {}", fault.code);
                                Step::Skip
                            } else {
                                warn!(
                                    "recognition error {}: {}",
                                    fault.code, fault.message
                                );
                                Step::Ev(Event::RecognitionFaulted)
                            }
                        }
                        Some(RecognitionEvent::Ended) | None => {
                            Step::Ev(Event::ListeningEnded)
                        }
                    },
                },

                Active::AwaitRetry { at } => tokio::select! {
                    cmd = self.cmd_rx.recv() => match cmd {
                        Some(Command::Shutdown) | None => Step::Quit,
                        Some(cmd) => Step::Ev(command_event(cmd)),
                    },
                    _ = tokio::time::sleep_until(*at) => Step::Ev(Event::RetryDue),
                },

                Active::Recording { session } => {
                    let deadline = session.hard_deadline();
                    tokio::select! {
                        cmd = self.cmd_rx.recv() => match cmd {
                            Some(Command::Shutdown) | None => Step::Quit,
                            Some(cmd) => Step::Ev(command_event(cmd)),
                        },
                        maybe_frame = session.next_frame() => match maybe_frame {
                            Some(frame) => match session.observe(frame) {
                                Some(StopReason::SilenceTimeout) => {
                                    Step::Ev(Event::SilenceTimeout)
                                }
                                Some(StopReason::MaxDuration) => {
                                    Step::Ev(Event::MaxDurationReached)
                                }
                                _ => Step::Skip,
                            },
                            None if session.is_stopped() => Step::Skip,
                            None => Step::Ev(Event::CaptureFailed(
                                FaultKind::DeviceLost,
                            )),
                        },
                        _ = tokio::time::sleep_until(deadline) => {
                            session.stop(StopReason::MaxDuration);
                            Step::Ev(Event::MaxDurationReached)
                        }
                    }
                }

                Active::AwaitResume { at } => tokio::select! {
                    cmd = self.cmd_rx.recv() => match cmd {
                        Some(Command::Shutdown) | None => Step::Quit,
                        Some(cmd) => Step::Ev(command_event(cmd)),
                    },
                    _ = tokio::time::sleep_until(*at) => Step::Ev(Event::ResumeDue),
                },
            };

            match step {
                Step::Skip => continue,
                Step::Ev(event) => self.apply(event).await,
                Step::Quit => {
                    self.apply(Event::StopRequested).await;
                    info!("voice activation controller shutting down");
                    break;
                }
            }
        }
    }

    /// Run one event through the machine and execute the resulting actions.
    /// Actions can feed follow-up events (a failed begin, a finished
    /// submission), hence the queue.
    async fn apply(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let before = self.machine.phase();
            for action in self.machine.apply(event) {
                self.perform(action, &mut queue).await;
            }
            let after = self.machine.phase();
            if before != after {
                info!("phase {:?} -> {:?} on {:?}", before, after, event);
            }
        }

        // a stop during a retry or resume wait produces no actions, so the
        // elapsed timer in the active slot must be dropped here
        if self.machine.phase() == Phase::Idle && !matches!(self.active, Active::Idle) {
            if let Active::Recording { session } =
                std::mem::replace(&mut self.active, Active::Idle)
            {
                session.abort().await;
            }
        }

        let phase = self.machine.phase();
        self.phase_tx.send_if_modified(|current| {
            if *current != phase {
                *current = phase;
                true
            } else {
                false
            }
        });
    }

    async fn perform(&mut self, action: Action, queue: &mut VecDeque<Event>) {
        match action {
            Action::BeginListening => {
                self.fault_tx.send_replace(None);
                match self.recognizer.begin().await {
                    Ok(events) => {
                        debug!("listening via {}", self.recognizer.name());
                        self.active = Active::Listening { events };
                    }
                    Err(e) => {
                        error!("could not start listening: {}", e);
                        self.active = Active::Idle;
                        queue.push_back(Event::ListeningFailed(fault_kind(&e)));
                    }
                }
            }

            Action::StopListening => {
                if let Err(e) = self.recognizer.stop().await {
                    warn!("error stopping recognizer: {}", e);
                }
                self.active = Active::Idle;
            }

            Action::ScheduleRetry => {
                self.active = Active::AwaitRetry {
                    at: Instant::now() + self.resume_delay,
                };
            }

            Action::BeginCapture => {
                let backend = AudioBackendFactory::create(
                    self.audio_source.clone(),
                    self.audio_config.clone(),
                );
                let session = match backend {
                    Ok(backend) => {
                        CaptureSession::begin(backend, self.settings.clone()).await
                    }
                    Err(e) => Err(e),
                };
                match session {
                    Ok(session) => self.active = Active::Recording { session },
                    Err(e) => {
                        error!("could not start capture: {}", e);
                        self.active = Active::Idle;
                        queue.push_back(Event::CaptureFailed(fault_kind(&e)));
                    }
                }
            }

            Action::FinishCapture(reason) => {
                let Active::Recording { mut session } =
                    std::mem::replace(&mut self.active, Active::Idle)
                else {
                    return;
                };
                session.stop(reason);
                match session.finish().await {
                    Ok((artifact, _mic)) => {
                        let transcript = self
                            .pending_match
                            .take()
                            .map(|m| m.transcript_fragment)
                            .unwrap_or_default();
                        let assembler = self.assembler.clone();
                        let user_id = self.user_id.clone();
                        // submission must not block the resume timer; a
                        // store failure is logged but never stops listening
                        tokio::spawn(async move {
                            if let Err(e) =
                                assembler.submit(artifact, &transcript, &user_id).await
                            {
                                error!("incident submission failed: {}", e);
                            }
                        });
                        queue.push_back(Event::SubmissionIssued);
                    }
                    Err(e) => {
                        error!("could not finalize recording: {}", e);
                        self.pending_match = None;
                        queue.push_back(Event::CaptureFailed(fault_kind(&e)));
                    }
                }
            }

            Action::AbortCapture => {
                if let Active::Recording { session } =
                    std::mem::replace(&mut self.active, Active::Idle)
                {
                    session.abort().await;
                }
                self.pending_match = None;
            }

            Action::ScheduleResume => {
                self.active = Active::AwaitResume {
                    at: Instant::now() + self.resume_delay,
                };
            }

            Action::SurfaceFault(kind) => {
                warn!("controller fault: {:?}", kind);
                self.fault_tx.send_replace(Some(kind));
            }
        }
    }
}

fn command_event(cmd: Command) -> Event {
    match cmd {
        Command::Start => Event::StartRequested,
        Command::Stop => Event::StopRequested,
        Command::ManualToggle => Event::ManualToggle,
        Command::Shutdown => Event::StopRequested,
    }
}

fn fault_kind(e: &Error) -> FaultKind {
    match e {
        Error::PermissionDenied(_) => FaultKind::PermissionDenied,
        Error::RecognitionUnsupported(_) => FaultKind::RecognitionUnsupported,
        Error::Recognition(_) => FaultKind::RecognitionFailed,
        _ => FaultKind::DeviceLost,
    }
}
