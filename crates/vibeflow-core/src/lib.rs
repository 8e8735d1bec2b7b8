//! VibeFlow Core - live song identification and audio visualization
//!
//! Decodes arbitrary input audio into mono PCM, streams microphone frames
//! to the match service, tracks the match protocol and renders spectral
//! views of whatever is being captured.

pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod teardown;
pub mod visual;

pub use config::VibeflowConfig;
pub use error::{Result, VibeflowError};
pub use pipeline::{PreparedAudio, SearchOutcome};
pub use session::{MatchClient, SessionHandle, SessionOutcome, SessionReport, SessionUpdate};
pub use teardown::Teardown;
pub use vibeflow_wav::PcmBuffer;
