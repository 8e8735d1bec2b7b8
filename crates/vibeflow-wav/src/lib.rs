//! VibeFlow PCM container library
//!
//! Canonical RIFF/WAVE layout (mono, 16-bit PCM) used both for whole-file
//! uploads and for the per-frame chunks streamed to the match service.

pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use error::WavError;
pub use format::{PcmBuffer, WavHeader, BITS_PER_SAMPLE, CHANNELS, FORMAT_PCM, HEADER_LEN};
pub use reader::{decode, dequantize, WavReader};
pub use writer::{encode, quantize, WavWriter};
