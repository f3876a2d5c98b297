pub mod artifact;
pub mod backend;
pub mod level;
pub mod synthetic;

pub use artifact::{encode_wav, AudioArtifact, StopReason};
pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use level::AudioLevelMonitor;
pub use synthetic::{FrameScript, ScriptSegment, SyntheticBackend};
