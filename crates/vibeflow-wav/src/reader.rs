//! Container reader
//!
//! Sample decoding is done by hound: integer PCM of 8 to 32 bits, 32-bit
//! float and `WAVE_FORMAT_EXTENSIBLE` headers, any channel count. Streaming
//! writers leave the data length unset or oversized, which hound refuses,
//! so the declared length is clamped to the bytes present first.

use crate::error::WavError;
use crate::format::{PcmBuffer, WavHeader, DATA, FMT, FORMAT_IEEE_FLOAT, FORMAT_PCM, RIFF, WAVE};
use std::borrow::Cow;
use std::io::Cursor;

/// Parsed view over a WAV byte slice
pub struct WavReader<'a> {
    header: WavHeader,
    inner: hound::WavReader<Cursor<Cow<'a, [u8]>>>,
}

impl<'a> WavReader<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, WavError> {
        if bytes.len() < 12 {
            return Err(WavError::Truncated(bytes.len()));
        }
        if bytes[0..4] != RIFF {
            return Err(WavError::NotRiff);
        }
        if bytes[8..12] != WAVE {
            return Err(WavError::NotWave);
        }

        let (bytes, data_len) = clamp_data_len(bytes)?;
        let inner = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = inner.spec();
        if spec.sample_rate == 0 {
            return Err(WavError::InvalidSampleRate);
        }

        let format_tag = match spec.sample_format {
            hound::SampleFormat::Int => FORMAT_PCM,
            hound::SampleFormat::Float => FORMAT_IEEE_FLOAT,
        };

        Ok(Self {
            header: WavHeader {
                format_tag,
                channels: spec.channels,
                sample_rate: spec.sample_rate,
                bits_per_sample: spec.bits_per_sample,
                data_len,
            },
            inner,
        })
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    /// Decode the payload into interleaved `f32` samples
    pub fn interleaved(&mut self) -> Result<Vec<f32>, WavError> {
        let spec = self.inner.spec();
        let samples = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, _) => self
                .inner
                .samples::<f32>()
                .collect::<Result<Vec<_>, hound::Error>>()?,
            (hound::SampleFormat::Int, 16) => self
                .inner
                .samples::<i16>()
                .map(|s| s.map(dequantize))
                .collect::<Result<Vec<_>, hound::Error>>()?,
            (hound::SampleFormat::Int, bits) => {
                let full_scale = (1i64 << (bits - 1)) as f32;
                self.inner
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<Vec<_>, hound::Error>>()?
            }
        };
        Ok(samples)
    }

    /// Decode and average channels into a mono buffer
    pub fn to_pcm(mut self) -> Result<PcmBuffer, WavError> {
        let interleaved = self.interleaved()?;
        let channels = self.header.channels as usize;

        let mono = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        PcmBuffer::new(mono, self.header.sample_rate)
    }
}

/// Inverse of [`crate::quantize`]
pub fn dequantize(sample: i16) -> f32 {
    if sample < 0 {
        sample as f32 / 32768.0
    } else {
        sample as f32 / 32767.0
    }
}

/// Decode a container into a mono buffer
pub fn decode(bytes: &[u8]) -> Result<PcmBuffer, WavError> {
    WavReader::parse(bytes)?.to_pcm()
}

/// Find the data chunk and shrink its declared length to whole frames
/// actually present. Returns the bytes to decode and the payload length.
fn clamp_data_len(bytes: &[u8]) -> Result<(Cow<'_, [u8]>, u32), WavError> {
    let mut pos = 12;
    let mut block_align = 1usize;

    while pos + 8 <= bytes.len() {
        let chunk_id = &bytes[pos..pos + 4];
        let declared = u32::from_le_bytes([
            bytes[pos + 4],
            bytes[pos + 5],
            bytes[pos + 6],
            bytes[pos + 7],
        ]) as usize;
        let body = pos + 8;

        if chunk_id == FMT {
            if let Some(align) = bytes.get(body + 12..body + 14) {
                block_align = (u16::from_le_bytes([align[0], align[1]]) as usize).max(1);
            }
        } else if chunk_id == DATA {
            let available = bytes.len() - body;
            if declared <= available {
                return Ok((Cow::Borrowed(bytes), declared as u32));
            }

            let len = available - available % block_align;
            log::debug!(
                "WAV data chunk declares {} bytes, {} present",
                declared,
                available
            );
            let mut patched = bytes[..body + len].to_vec();
            patched[pos + 4..pos + 8].copy_from_slice(&(len as u32).to_le_bytes());
            return Ok((Cow::Owned(patched), len as u32));
        } else {
            log::debug!(
                "Skipping WAV chunk {:?} ({} bytes)",
                String::from_utf8_lossy(chunk_id),
                declared
            );
        }

        // Chunks are word aligned
        pos = body.saturating_add(declared).saturating_add(declared & 1);
    }

    Err(WavError::MissingChunk("data"))
}
