use super::backend::AudioFrame;

/// Silence threshold on the 0-255 mean-amplitude scale
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 30.0;

/// Contiguous silence required before a recording stops
pub const DEFAULT_SILENCE_WINDOW_MS: u64 = 15_000;

/// Tracks microphone amplitude during a recording and decides when a
/// contiguous silence window has elapsed.
///
/// Time is taken from frame timestamps rather than the wall clock, so the
/// silence decision is deterministic for a given frame sequence. Only a
/// contiguous window counts: any frame at or above the threshold resets the
/// countdown, cumulative silence never triggers.
#[derive(Debug)]
pub struct AudioLevelMonitor {
    threshold: f32,
    window_ms: u64,
    silence_started_at: Option<u64>,
}

impl AudioLevelMonitor {
    pub fn new(threshold: f32, window_ms: u64) -> Self {
        Self {
            threshold,
            window_ms,
            silence_started_at: None,
        }
    }

    /// Mean absolute amplitude of a frame, scaled to 0-255
    pub fn mean_level(samples: &[i16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = samples.iter().map(|&s| (s as f64).abs()).sum();
        (sum / samples.len() as f64 / i16::MAX as f64 * 255.0) as f32
    }

    /// Observe one frame; returns true when the silence window has elapsed
    pub fn observe(&mut self, frame: &AudioFrame) -> bool {
        let level = Self::mean_level(&frame.samples);

        if level < self.threshold {
            let started = *self.silence_started_at.get_or_insert(frame.timestamp_ms);
            frame.timestamp_ms.saturating_sub(started) >= self.window_ms
        } else {
            self.silence_started_at = None;
            false
        }
    }

    pub fn reset(&mut self) {
        self.silence_started_at = None;
    }
}
