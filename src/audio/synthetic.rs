use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use crate::{Error, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One stretch of constant-amplitude audio in a frame script
#[derive(Debug, Clone)]
pub struct ScriptSegment {
    /// How long this segment lasts (scripted time, carried in frame timestamps)
    pub duration_ms: u64,
    /// Constant absolute sample amplitude for the segment
    pub amplitude: i16,
}

/// Scripted audio for the synthetic backend
///
/// Frame timestamps advance by the configured frame duration regardless of
/// wall-clock pacing, so stop conditions driven by frame time are
/// deterministic in tests.
#[derive(Debug, Clone, Default)]
pub struct FrameScript {
    pub segments: Vec<ScriptSegment>,
    /// Keep emitting silent frames after the script runs out. When false the
    /// channel closes at end of script, which consumers see as device loss.
    pub then_silence: bool,
    /// Wall-clock delay between frames. Zero floods frames as fast as the
    /// consumer drains them.
    pub pacing: Duration,
    /// Fail `start` with PermissionDenied instead of producing frames
    pub deny_permission: bool,
}

impl FrameScript {
    pub fn silence(duration_ms: u64) -> Self {
        Self {
            segments: vec![ScriptSegment {
                duration_ms,
                amplitude: 0,
            }],
            ..Default::default()
        }
    }

    pub fn speech(duration_ms: u64) -> Self {
        Self {
            segments: vec![ScriptSegment {
                duration_ms,
                amplitude: 12_000,
            }],
            ..Default::default()
        }
    }

    pub fn denied() -> Self {
        Self {
            deny_permission: true,
            ..Default::default()
        }
    }
}

/// In-process audio backend that plays back a `FrameScript`
///
/// Stands in for a real microphone in tests and simulation runs; the
/// platform capture backend plugs in behind the same `AudioBackend` trait.
#[derive(Debug)]
pub struct SyntheticBackend {
    script: FrameScript,
    config: AudioBackendConfig,
    task: Option<JoinHandle<()>>,
}

impl SyntheticBackend {
    pub fn new(script: FrameScript, config: AudioBackendConfig) -> Self {
        Self {
            script,
            config,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for SyntheticBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.script.deny_permission {
            return Err(Error::PermissionDenied(
                "microphone access refused".to_string(),
            ));
        }
        if self.task.is_some() {
            return Err(Error::Device("backend already capturing".to_string()));
        }

        let (tx, rx) = mpsc::channel(64);
        let script = self.script.clone();
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            let frame_ms = config.frame_duration_ms.max(1);
            let samples_per_frame =
                (config.sample_rate as u64 * config.channels as u64 * frame_ms / 1000) as usize;
            let mut timestamp_ms = 0u64;

            for segment in &script.segments {
                let mut remaining = segment.duration_ms;
                while remaining > 0 {
                    let frame = AudioFrame {
                        samples: vec![segment.amplitude; samples_per_frame],
                        sample_rate: config.sample_rate,
                        channels: config.channels,
                        timestamp_ms,
                    };
                    if tx.send(frame).await.is_err() {
                        return; // consumer gone, stop producing
                    }
                    timestamp_ms += frame_ms;
                    remaining = remaining.saturating_sub(frame_ms);
                    if !script.pacing.is_zero() {
                        tokio::time::sleep(script.pacing).await;
                    }
                }
            }

            if script.then_silence {
                loop {
                    let frame = AudioFrame {
                        samples: vec![0; samples_per_frame],
                        sample_rate: config.sample_rate,
                        channels: config.channels,
                        timestamp_ms,
                    };
                    if tx.send(frame).await.is_err() {
                        return;
                    }
                    timestamp_ms += frame_ms;
                    if !script.pacing.is_zero() {
                        tokio::time::sleep(script.pacing).await;
                    }
                }
            }

            debug!("synthetic audio script exhausted");
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("synthetic backend stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_produces_expected_frame_count() {
        let mut backend = SyntheticBackend::new(
            FrameScript::silence(500),
            AudioBackendConfig {
                frame_duration_ms: 100,
                ..Default::default()
            },
        );

        let mut rx = backend.start().await.unwrap();
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }

        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].timestamp_ms, 0);
        assert_eq!(frames[4].timestamp_ms, 400);
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn denied_script_fails_start() {
        let mut backend =
            SyntheticBackend::new(FrameScript::denied(), AudioBackendConfig::default());
        let err = backend.start().await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }
}
