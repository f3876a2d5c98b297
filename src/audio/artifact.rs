use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Why a recording session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Contiguous low-amplitude window elapsed
    SilenceTimeout,
    /// Hard cap on session length reached
    MaxDuration,
    /// User or teardown requested the stop
    ManualStop,
}

/// Finished output of a capture session. Immutable once produced.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    /// Encoded audio (WAV)
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime_type: String,
    /// Recorded duration in milliseconds
    pub duration_ms: u64,
    /// Which stop condition ended the session
    pub stop_reason: StopReason,
}

impl AudioArtifact {
    /// Finalize buffered PCM samples into a WAV artifact
    pub fn from_samples(
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
        stop_reason: StopReason,
    ) -> Result<Self> {
        let bytes = encode_wav(samples, sample_rate, channels)?;
        let duration_ms = if sample_rate == 0 || channels == 0 {
            0
        } else {
            samples.len() as u64 * 1000 / (sample_rate as u64 * channels as u64)
        };

        Ok(Self {
            bytes,
            mime_type: "audio/wav".to_string(),
            duration_ms,
            stop_reason,
        })
    }
}

/// Encode i16 PCM samples as WAV bytes
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_duration_comes_from_sample_count() {
        // 16000 samples at 16kHz mono = 1 second
        let samples = vec![0i16; 16_000];
        let artifact =
            AudioArtifact::from_samples(&samples, 16_000, 1, StopReason::SilenceTimeout).unwrap();

        assert_eq!(artifact.duration_ms, 1_000);
        assert_eq!(artifact.mime_type, "audio/wav");
        assert_eq!(artifact.stop_reason, StopReason::SilenceTimeout);
        assert!(!artifact.bytes.is_empty());
    }

    #[test]
    fn wav_bytes_carry_a_riff_header() {
        let bytes = encode_wav(&[100, -200, 300], 16_000, 1).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }
}
