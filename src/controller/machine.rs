use crate::audio::StopReason;
use serde::Serialize;

/// Controller phase. The single source of truth every subsystem checks
/// before acting; mutation happens only through [`Machine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Listening,
    Recording,
    /// Transient exit path of Recording: artifact finalized, submission
    /// issued, resume pending
    Processing,
}

/// Unrecoverable condition surfaced to the user; the controller parks in
/// Idle until an explicit start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    PermissionDenied,
    RecognitionUnsupported,
    RecognitionFailed,
    DeviceLost,
}

/// Everything that can happen to the controller, collapsed into one enum so
/// the transition function is testable with synthetic events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    StartRequested,
    StopRequested,
    ManualToggle,
    /// Listening could not begin (permission, unsupported engine)
    ListeningFailed(FaultKind),
    TriggerMatched,
    /// Unexpected recognition error (expected codes never reach the machine)
    RecognitionFaulted,
    /// Natural end of the recognition stream
    ListeningEnded,
    RetryDue,
    SilenceTimeout,
    MaxDurationReached,
    /// Capture could not start, the device died mid-recording, or the
    /// artifact could not be finalized
    CaptureFailed(FaultKind),
    SubmissionIssued,
    ResumeDue,
}

/// Side effects the driver must perform, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    BeginListening,
    StopListening,
    BeginCapture,
    FinishCapture(StopReason),
    AbortCapture,
    ScheduleRetry,
    ScheduleResume,
    SurfaceFault(FaultKind),
}

/// Pure controller state machine
///
/// Out-of-phase events are ignored rather than rejected: asynchronous
/// completions can arrive after the state that scheduled them is gone, and
/// dropping them is the correct response.
#[derive(Debug)]
pub struct Machine {
    phase: Phase,
    /// True while a recognition stream is live (Listening also covers the
    /// retry wait, where nothing owns the microphone)
    listening_active: bool,
    consecutive_errors: u32,
    max_errors: u32,
}

impl Machine {
    pub fn new(max_errors: u32) -> Self {
        Self {
            phase: Phase::Idle,
            listening_active: false,
            consecutive_errors: 0,
            max_errors,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Reset the error streak; called when recognition produces output
    pub fn note_activity(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Apply one event, returning the actions to perform
    pub fn apply(&mut self, event: Event) -> Vec<Action> {
        use Action::*;
        use Event::*;

        match (self.phase, event) {
            (Phase::Idle, StartRequested) => {
                self.phase = Phase::Listening;
                self.listening_active = true;
                self.consecutive_errors = 0;
                vec![BeginListening]
            }
            // re-entrancy guard: a second start must not spawn a second
            // detector
            (_, StartRequested) => vec![],

            (Phase::Listening, ListeningFailed(kind)) => {
                self.phase = Phase::Idle;
                self.listening_active = false;
                vec![SurfaceFault(kind)]
            }

            (Phase::Listening, TriggerMatched) if self.listening_active => {
                self.phase = Phase::Recording;
                self.listening_active = false;
                self.consecutive_errors = 0;
                vec![StopListening, BeginCapture]
            }

            // works both with a live stream and during the retry wait
            (Phase::Listening, ManualToggle) => {
                self.phase = Phase::Recording;
                let was_active = self.listening_active;
                self.listening_active = false;
                if was_active {
                    vec![StopListening, BeginCapture]
                } else {
                    vec![BeginCapture]
                }
            }

            (Phase::Listening, RecognitionFaulted) if self.listening_active => {
                self.consecutive_errors += 1;
                self.listening_active = false;
                if self.consecutive_errors >= self.max_errors {
                    self.phase = Phase::Idle;
                    vec![StopListening, SurfaceFault(FaultKind::RecognitionFailed)]
                } else {
                    vec![StopListening, ScheduleRetry]
                }
            }

            (Phase::Listening, ListeningEnded) if self.listening_active => {
                self.listening_active = false;
                vec![StopListening, ScheduleRetry]
            }

            (Phase::Listening, RetryDue) if !self.listening_active => {
                self.listening_active = true;
                vec![BeginListening]
            }

            (Phase::Listening, StopRequested) => {
                self.phase = Phase::Idle;
                let was_active = self.listening_active;
                self.listening_active = false;
                if was_active {
                    vec![StopListening]
                } else {
                    vec![]
                }
            }

            (Phase::Recording, SilenceTimeout) => {
                self.phase = Phase::Processing;
                vec![FinishCapture(StopReason::SilenceTimeout)]
            }

            (Phase::Recording, MaxDurationReached) => {
                self.phase = Phase::Processing;
                vec![FinishCapture(StopReason::MaxDuration)]
            }

            (Phase::Recording, ManualToggle) => {
                self.phase = Phase::Processing;
                vec![FinishCapture(StopReason::ManualStop)]
            }

            (Phase::Recording, CaptureFailed(kind)) => {
                self.phase = Phase::Idle;
                vec![AbortCapture, SurfaceFault(kind)]
            }

            // explicit teardown mid-recording releases everything without
            // producing an incident
            (Phase::Recording, StopRequested) => {
                self.phase = Phase::Idle;
                vec![AbortCapture]
            }

            (Phase::Processing, SubmissionIssued) => vec![ScheduleResume],

            // finalization failed after the session was consumed; nothing
            // left to abort
            (Phase::Processing, CaptureFailed(kind)) => {
                self.phase = Phase::Idle;
                vec![SurfaceFault(kind)]
            }

            (Phase::Processing, ResumeDue) => {
                self.phase = Phase::Listening;
                self.listening_active = true;
                vec![BeginListening]
            }

            (Phase::Processing, StopRequested) => {
                self.phase = Phase::Idle;
                vec![]
            }

            // anything else is a stale completion for a state we left
            _ => vec![],
        }
    }
}
