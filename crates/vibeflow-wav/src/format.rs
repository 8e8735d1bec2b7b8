//! Container layout and the normalized sample buffer it carries

use crate::error::WavError;

pub const RIFF: [u8; 4] = *b"RIFF";
pub const WAVE: [u8; 4] = *b"WAVE";
pub const FMT: [u8; 4] = *b"fmt ";
pub const DATA: [u8; 4] = *b"data";

/// Format tag for integer PCM
pub const FORMAT_PCM: u16 = 1;
/// Format tag for IEEE float samples
pub const FORMAT_IEEE_FLOAT: u16 = 3;

/// Canonical output is always mono
pub const CHANNELS: u16 = 1;
/// Canonical output is always 16-bit
pub const BITS_PER_SAMPLE: u16 = 16;

/// RIFF header + fmt chunk + data chunk header
pub const HEADER_LEN: usize = 44;

/// Size of the PCM fmt chunk body
pub const FMT_CHUNK_LEN: u32 = 16;

/// Mono time-domain samples at a fixed rate
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, WavError> {
        if sample_rate == 0 {
            return Err(WavError::InvalidSampleRate);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Buffer of `len` zero samples
    pub fn silence(len: usize, sample_rate: u32) -> Result<Self, WavError> {
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Header fields of a container.
///
/// Byte rate and block alignment are always recomputed from the stored
/// fields so they cannot drift out of sync with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Length of the data chunk payload in bytes
    pub data_len: u32,
}

impl WavHeader {
    /// Header for `num_samples` mono 16-bit samples
    pub fn canonical(sample_rate: u32, num_samples: usize) -> Result<Self, WavError> {
        if sample_rate == 0 {
            return Err(WavError::InvalidSampleRate);
        }
        let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
        if sample_rate.checked_mul(block_align as u32).is_none() {
            return Err(WavError::SampleRateTooHigh(sample_rate));
        }

        let payload = num_samples
            .checked_mul(Self::bytes_per_sample(BITS_PER_SAMPLE))
            .ok_or(WavError::PayloadTooLarge(usize::MAX))?;
        let max_payload = (u32::MAX - (HEADER_LEN as u32 - 8)) as usize;
        if payload > max_payload {
            return Err(WavError::PayloadTooLarge(payload));
        }

        Ok(Self {
            format_tag: FORMAT_PCM,
            channels: CHANNELS,
            sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            data_len: payload as u32,
        })
    }

    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    /// Saturates for headers built by hand with an out-of-range rate
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(self.block_align() as u32)
    }

    /// Value of the RIFF size field (file length minus 8)
    pub fn riff_len(&self) -> u32 {
        HEADER_LEN as u32 - 8 + self.data_len
    }

    pub fn is_canonical(&self) -> bool {
        self.format_tag == FORMAT_PCM
            && self.channels == CHANNELS
            && self.bits_per_sample == BITS_PER_SAMPLE
    }

    /// Serialize to the 44-byte little-endian layout
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&RIFF);
        out[4..8].copy_from_slice(&self.riff_len().to_le_bytes());
        out[8..12].copy_from_slice(&WAVE);
        out[12..16].copy_from_slice(&FMT);
        out[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
        out[20..22].copy_from_slice(&self.format_tag.to_le_bytes());
        out[22..24].copy_from_slice(&self.channels.to_le_bytes());
        out[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        out[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        out[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        out[36..40].copy_from_slice(&DATA);
        out[40..44].copy_from_slice(&self.data_len.to_le_bytes());
        out
    }

    fn bytes_per_sample(bits: u16) -> usize {
        (bits / 8) as usize
    }
}
