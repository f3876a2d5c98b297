// Integration tests for the recording capture path
//
// Synthetic audio scripts carry their own frame timestamps, so the stop
// conditions resolve deterministically without waiting wall-clock time.

use std::time::Duration;
use tokio::sync::mpsc;
use voice_sos::capture::{run_to_completion, CaptureSession};
use voice_sos::config::CaptureSettings;
use voice_sos::{
    AudioBackendConfig, AudioBackendFactory, AudioSource, FrameScript, ScriptSegment,
    StopReason,
};

async fn session_for(script: FrameScript) -> CaptureSession {
    let backend = AudioBackendFactory::create(
        AudioSource::Synthetic(script),
        AudioBackendConfig::default(),
    )
    .unwrap();
    CaptureSession::begin(backend, CaptureSettings::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_silence_timeout_produces_wav_artifact() {
    let script = FrameScript {
        segments: vec![
            ScriptSegment {
                duration_ms: 2_000,
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

    let session = session_for(script).await;
    let (_tx, manual_stop) = mpsc::channel(1);

    let (artifact, _mic) = run_to_completion(session, manual_stop).await.unwrap();

    assert_eq!(artifact.stop_reason, StopReason::SilenceTimeout);
    assert_eq!(artifact.mime_type, "audio/wav");
    // 2s speech, then the 15s window runs from the first silent frame
    assert!(artifact.duration_ms >= 17_000 && artifact.duration_ms < 18_000);
    assert_eq!(&artifact.bytes[..4], b"RIFF");
    assert_eq!(&artifact.bytes[8..12], b"WAVE");
}

#[tokio::test]
async fn test_manual_stop_keeps_short_recordings() {
    let mut script = FrameScript::speech(400);
    script.then_silence = true;
    script.pacing = Duration::from_millis(2);

    let session = session_for(script).await;

    let (stop_tx, manual_stop) = mpsc::channel(1);
    stop_tx.send(()).await.unwrap();

    let (artifact, _mic) = run_to_completion(session, manual_stop).await.unwrap();
    assert_eq!(artifact.stop_reason, StopReason::ManualStop);
    assert!(artifact.duration_ms < 30_000);
}
