use crate::audio::{
    AudioArtifact, AudioBackend, AudioFrame, AudioLevelMonitor, StopReason,
};
use crate::config::CaptureSettings;
use crate::{Error, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};

/// One recording attempt
///
/// Owns the microphone backend for its whole lifetime: acquired in `begin`,
/// released in `finish`/`abort`, never shared. Two stop conditions are armed
/// independently (hard cap and silence timeout) plus the manual path;
/// whichever fires first wins and `stop` is idempotent after that.
pub struct CaptureSession {
    backend: Box<dyn AudioBackend>,
    frames: mpsc::Receiver<AudioFrame>,
    monitor: AudioLevelMonitor,
    settings: CaptureSettings,
    samples: Vec<i16>,
    /// Frame-time milliseconds captured so far (drives the hard cap
    /// deterministically; the wall-clock deadline is the backstop)
    elapsed_ms: u64,
    started_at: Instant,
    stop_reason: Option<StopReason>,
}

impl CaptureSession {
    /// Acquire the microphone and start buffering audio
    pub async fn begin(
        mut backend: Box<dyn AudioBackend>,
        settings: CaptureSettings,
    ) -> Result<Self> {
        let frames = backend.start().await?;
        info!(
            "capture session started ({}): cap {}ms, silence window {}ms",
            backend.name(),
            settings.max_duration_ms,
            settings.silence_window_ms
        );

        let monitor =
            AudioLevelMonitor::new(settings.silence_threshold, settings.silence_window_ms);

        Ok(Self {
            backend,
            frames,
            monitor,
            settings,
            samples: Vec::new(),
            elapsed_ms: 0,
            started_at: Instant::now(),
            stop_reason: None,
        })
    }

    /// Receive the next frame. `None` before `stop` means the device died.
    pub async fn next_frame(&mut self) -> Option<AudioFrame> {
        self.frames.recv().await
    }

    /// Wall-clock backstop for the hard cap
    pub fn hard_deadline(&self) -> Instant {
        self.started_at + Duration::from_millis(self.settings.max_duration_ms)
    }

    /// Buffer one frame and evaluate the automatic stop conditions.
    /// Returns the stop reason once one of them fires.
    pub fn observe(&mut self, frame: AudioFrame) -> Option<StopReason> {
        if self.stop_reason.is_some() {
            return self.stop_reason;
        }

        self.samples.extend_from_slice(&frame.samples);
        self.elapsed_ms = frame
            .timestamp_ms
            .saturating_add(frame_duration_ms(&frame))
            .max(self.elapsed_ms);

        if self.elapsed_ms >= self.settings.max_duration_ms {
            self.stop(StopReason::MaxDuration);
        } else if self.monitor.observe(&frame) {
            self.stop(StopReason::SilenceTimeout);
        }

        self.stop_reason
    }

    /// Record the stop reason. Idempotent: the first caller wins and later
    /// calls (a manual stop racing the timer, say) are no-ops.
    pub fn stop(&mut self, reason: StopReason) -> bool {
        if self.stop_reason.is_some() {
            return false;
        }
        info!("capture stopping: {:?}", reason);
        self.stop_reason = Some(reason);
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// Release the microphone and finalize the buffered audio into an
    /// artifact tagged with the stop reason.
    pub async fn finish(mut self) -> Result<(AudioArtifact, Box<dyn AudioBackend>)> {
        let reason = self
            .stop_reason
            .ok_or_else(|| Error::Device("finish called before stop".to_string()))?;

        self.frames.close();
        if let Err(e) = self.backend.stop().await {
            warn!("error releasing audio backend: {}", e);
        }

        let artifact = AudioArtifact::from_samples(
            &self.samples,
            self.settings.sample_rate,
            self.settings.channels,
            reason,
        )?;

        info!(
            "capture finished: {:?}, {}ms, {} bytes",
            reason, artifact.duration_ms, artifact.bytes.len()
        );

        Ok((artifact, self.backend))
    }

    /// Release the microphone without producing an artifact (device error
    /// or controller teardown)
    pub async fn abort(mut self) -> Box<dyn AudioBackend> {
        self.frames.close();
        if let Err(e) = self.backend.stop().await {
            warn!("error releasing audio backend: {}", e);
        }
        info!("capture aborted, no artifact produced");
        self.backend
    }
}

fn frame_duration_ms(frame: &AudioFrame) -> u64 {
    if frame.sample_rate == 0 || frame.channels == 0 {
        return 0;
    }
    frame.samples.len() as u64 * 1000 / (frame.sample_rate as u64 * frame.channels as u64)
}

/// Drive a capture session to completion, honoring a manual-stop signal
///
/// One-shot driver for recordings that run outside the controller; also
/// keeps the stop-condition race testable on its own. The controller
/// drives its sessions inline so commands stay responsive mid-recording.
pub async fn run_to_completion(
    mut session: CaptureSession,
    mut manual_stop: mpsc::Receiver<()>,
) -> Result<(AudioArtifact, Box<dyn AudioBackend>)> {
    let deadline = session.hard_deadline();

    loop {
        tokio::select! {
            maybe_frame = session.next_frame() => {
                match maybe_frame {
                    Some(frame) => {
                        if session.observe(frame).is_some() {
                            return session.finish().await;
                        }
                    }
                    None => {
                        let backend = session.abort().await;
                        drop(backend);
                        return Err(Error::Device(
                            "audio device lost mid-capture".to_string(),
                        ));
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                session.stop(StopReason::MaxDuration);
                return session.finish().await;
            }
            _ = manual_stop.recv() => {
                session.stop(StopReason::ManualStop);
                return session.finish().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioBackendConfig, AudioBackendFactory, AudioSource, FrameScript};

    fn settings() -> CaptureSettings {
        CaptureSettings::default()
    }

    fn backend(script: FrameScript) -> Box<dyn AudioBackend> {
        AudioBackendFactory::create(
            AudioSource::Synthetic(script),
            AudioBackendConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn silence_produces_silence_timeout() {
        let mut script = FrameScript::silence(16_000);
        script.then_silence = true;
        let session = CaptureSession::begin(backend(script), settings())
            .await
            .unwrap();
        let (_, stop_rx) = mpsc::channel(1);

        let (artifact, _mic) = run_to_completion(session, stop_rx).await.unwrap();
        assert_eq!(artifact.stop_reason, StopReason::SilenceTimeout);
        // window is 15s; the first frame past it carries the decision
        assert!(artifact.duration_ms >= 15_000 && artifact.duration_ms < 16_000);
    }

    #[tokio::test]
    async fn continuous_speech_hits_the_hard_cap() {
        let mut script = FrameScript::speech(31_000);
        script.then_silence = true;
        let session = CaptureSession::begin(backend(script), settings())
            .await
            .unwrap();
        let (_, stop_rx) = mpsc::channel(1);

        let (artifact, _mic) = run_to_completion(session, stop_rx).await.unwrap();
        assert_eq!(artifact.stop_reason, StopReason::MaxDuration);
        assert_eq!(artifact.duration_ms, 30_000);
    }

    #[tokio::test]
    async fn manual_stop_wins_over_pending_timers() {
        let mut script = FrameScript::speech(100);
        script.then_silence = true;
        script.pacing = Duration::from_millis(5);
        let session = CaptureSession::begin(backend(script), settings())
            .await
            .unwrap();

        let (stop_tx, stop_rx) = mpsc::channel(1);
        stop_tx.send(()).await.unwrap();

        let (artifact, _mic) = run_to_completion(session, stop_rx).await.unwrap();
        assert_eq!(artifact.stop_reason, StopReason::ManualStop);
    }

    #[tokio::test]
    async fn device_loss_aborts_without_artifact() {
        // script ends and the channel closes: device gone
        let script = FrameScript::speech(500);
        let session = CaptureSession::begin(backend(script), settings())
            .await
            .unwrap();
        let (_stop_tx, stop_rx) = mpsc::channel(1);

        let err = run_to_completion(session, stop_rx).await.unwrap_err();
        assert!(matches!(err, Error::Device(_)));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut script = FrameScript::silence(100);
        script.then_silence = true;
        let mut session = CaptureSession::begin(backend(script), settings())
            .await
            .unwrap();

        assert!(session.stop(StopReason::ManualStop));
        assert!(!session.stop(StopReason::SilenceTimeout));

        let (artifact, _mic) = session.finish().await.unwrap();
        assert_eq!(artifact.stop_reason, StopReason::ManualStop);
    }

    #[tokio::test]
    async fn speech_interruption_restarts_silence_window() {
        use crate::audio::ScriptSegment;

        let script = FrameScript {
            segments: vec![
                ScriptSegment { duration_ms: 5_000, amplitude: 10 },
                ScriptSegment { duration_ms: 1_000, amplitude: 12_000 },
                ScriptSegment { duration_ms: 16_000, amplitude: 10 },
            ],
            then_silence: true,
            ..Default::default()
        };
        let session = CaptureSession::begin(backend(script), settings())
            .await
            .unwrap();
        let (_stop_tx, stop_rx) = mpsc::channel(1);

        let (artifact, _mic) = run_to_completion(session, stop_rx).await.unwrap();
        // 5s silence is wiped by the speech burst; a fresh 15s window then
        // runs from 6s and fires around 21s, well under the hard cap
        assert_eq!(artifact.stop_reason, StopReason::SilenceTimeout);
        assert!(artifact.duration_ms >= 21_000 && artifact.duration_ms < 22_000);
    }
}
