//! Container writer

use crate::error::WavError;
use crate::format::{PcmBuffer, WavHeader, HEADER_LEN};
use std::io::Write;

/// Quantize a normalized sample to signed 16-bit.
///
/// Negative values scale by 32768 and positive values by 32767 so that
/// both -1.0 and +1.0 land exactly on the i16 range limits.
pub fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode mono samples into a complete container
pub fn encode(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, WavError> {
    let header = WavHeader::canonical(sample_rate, samples.len())?;
    let mut out = Vec::with_capacity(HEADER_LEN + header.data_len as usize);
    WavWriter::new(&mut out).write(&header, samples)?;
    Ok(out)
}

impl PcmBuffer {
    pub fn encode(&self) -> Result<Vec<u8>, WavError> {
        encode(self.samples(), self.sample_rate())
    }
}

pub struct WavWriter<W: Write> {
    inner: W,
}

impl<W: Write> WavWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write header and payload
    pub fn write(&mut self, header: &WavHeader, samples: &[f32]) -> Result<(), WavError> {
        self.write_header(header)?;
        self.write_samples(samples)?;
        self.inner.flush()?;
        Ok(())
    }

    fn write_header(&mut self, header: &WavHeader) -> Result<(), WavError> {
        self.inner.write_all(&header.to_bytes())?;
        Ok(())
    }

    fn write_samples(&mut self, samples: &[f32]) -> Result<(), WavError> {
        for &sample in samples {
            self.inner.write_all(&quantize(sample).to_le_bytes())?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_limits() {
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(2.5), 32767);
        assert_eq!(quantize(-7.0), -32768);
    }

    #[test]
    fn test_quantize_truncates_toward_zero() {
        assert_eq!(quantize(0.5), 16383);
        assert_eq!(quantize(-0.5), -16384);
    }

    #[test]
    fn test_one_second_of_silence() {
        let samples = vec![0.0f32; 8000];
        let bytes = encode(&samples, 8000).unwrap();

        assert_eq!(bytes.len(), 44 + 16000);
        assert!(bytes[44..].iter().all(|&b| b == 0));
        assert_eq!(
            u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
            16000
        );
        assert_eq!(
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            36 + 16000
        );
    }

    #[test]
    fn test_empty_buffer_is_valid_container() {
        let bytes = encode(&[], 44100).unwrap();
        assert_eq!(bytes.len(), 44);
        assert_eq!(&bytes[36..40], b"data");
    }

    #[test]
    fn test_invalid_sample_rate() {
        assert!(matches!(encode(&[0.1], 0), Err(WavError::InvalidSampleRate)));
        assert!(matches!(
            encode(&[0.1], u32::MAX),
            Err(WavError::SampleRateTooHigh(_))
        ));
    }

    #[test]
    fn test_readable_by_hound() {
        let samples: Vec<f32> = (0..441)
            .map(|i| (i as f32 / 441.0 * std::f32::consts::TAU).sin() * 0.8)
            .collect();
        let bytes = encode(&samples, 44100).unwrap();

        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        let expected: Vec<i16> = samples.iter().map(|&s| quantize(s)).collect();
        assert_eq!(decoded, expected);
    }
}
