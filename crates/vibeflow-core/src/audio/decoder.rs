//! Audio decoding for multiple formats

use super::{probe, AudioFormat};
use crate::error::{Result, VibeflowError};
use std::io::Cursor;

/// Decoded audio data, interleaved at the source's native rate
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u32,
}

impl AudioData {
    pub(crate) fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(VibeflowError::UnsupportedFormat(
                "stream carries no audio parameters".to_string(),
            ));
        }
        let duration_ms =
            (samples.len() as f64 / (sample_rate as f64 * channels as f64) * 1000.0) as u32;
        Ok(Self {
            samples,
            sample_rate,
            channels,
            duration_ms,
        })
    }

    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        downmix(&self.samples, self.channels)
    }
}

/// Average each frame of `channels` interleaved samples into one.
///
/// Mono input is returned unchanged; a trailing partial frame is averaged
/// over the samples present.
pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Decode a complete in-memory file
pub fn decode_bytes(bytes: &[u8], hint: Option<&str>) -> Result<AudioData> {
    if bytes.is_empty() {
        return Err(VibeflowError::UnsupportedFormat("empty input".to_string()));
    }

    let format = AudioFormat::detect(bytes, hint);
    log::debug!("Decoding {} bytes as {:?}", bytes.len(), format);

    match format {
        AudioFormat::Wav => decode_wav(bytes),
        AudioFormat::Mp3 => decode_mp3(bytes),
        AudioFormat::Flac => decode_flac(bytes),
        AudioFormat::Ogg => decode_ogg(bytes),
        // Containers and unknown input: let symphonia probe it
        other => probe::decode_with_probe(bytes, other),
    }
}

fn unsupported(what: &str, err: impl std::fmt::Display) -> VibeflowError {
    VibeflowError::UnsupportedFormat(format!("{}: {}", what, err))
}

/// Decode WAV, tolerating the oversized data lengths streaming writers leave
fn decode_wav(bytes: &[u8]) -> Result<AudioData> {
    let mut reader = vibeflow_wav::WavReader::parse(bytes).map_err(|e| unsupported("WAV", e))?;
    let header = *reader.header();
    let samples = reader.interleaved().map_err(|e| unsupported("WAV", e))?;

    AudioData::new(samples, header.sample_rate, header.channels)
}

/// Decode MP3
fn decode_mp3(bytes: &[u8]) -> Result<AudioData> {
    let mut decoder = minimp3::Decoder::new(bytes);
    let mut samples = Vec::new();
    let mut sample_rate = 0;
    let mut channels = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                }
                // Convert i16 to f32
                samples.extend(frame.data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            // Trailing garbage after valid frames is tolerated
            Err(e) if !samples.is_empty() => {
                log::warn!("MP3 stream ended early: {}", e);
                break;
            }
            Err(e) => return Err(unsupported("MP3", e)),
        }
    }

    AudioData::new(samples, sample_rate, channels)
}

/// Decode FLAC
fn decode_flac(bytes: &[u8]) -> Result<AudioData> {
    let mut reader =
        claxon::FlacReader::new(Cursor::new(bytes)).map_err(|e| unsupported("FLAC", e))?;

    let info = reader.streaminfo();
    let max_val = (1i64 << (info.bits_per_sample - 1)) as f32;
    let samples: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / max_val))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| unsupported("FLAC", e))?;

    AudioData::new(samples, info.sample_rate, info.channels as u16)
}

/// Decode Ogg Vorbis
fn decode_ogg(bytes: &[u8]) -> Result<AudioData> {
    let mut reader = lewton::inside_ogg::OggStreamReader::new(Cursor::new(bytes))
        .map_err(|e| unsupported("Ogg Vorbis", e))?;

    let sample_rate = reader.ident_hdr.audio_sample_rate;
    let channels = reader.ident_hdr.audio_channels as u16;

    let mut samples = Vec::new();
    while let Some(packet) = reader
        .read_dec_packet_itl()
        .map_err(|e| unsupported("Ogg Vorbis", e))?
    {
        samples.extend(packet.iter().map(|&s| s as f32 / 32768.0));
    }

    AudioData::new(samples, sample_rate, channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mono_downmix_is_identity() {
        let mono = vec![0.1, -0.4, 0.9, 0.0];
        assert_eq!(downmix(&mono, 1), mono);
    }

    #[test]
    fn test_opposite_stereo_cancels() {
        let stereo: Vec<f32> = [1.0f32, -1.0].repeat(64);
        let mono = downmix(&stereo, 2);
        assert_eq!(mono.len(), 64);
        assert!(mono.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_multichannel_average() {
        let quad = vec![0.4, 0.0, 0.0, 0.0, 1.0, 1.0, -1.0, -1.0];
        let mono = downmix(&quad, 4);
        assert_eq!(mono.len(), 2);
        assert_relative_eq!(mono[0], 0.1);
        assert_relative_eq!(mono[1], 0.0);
    }

    #[test]
    fn test_decode_stereo_wav() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let spec = hound::WavSpec {
                channels: 2,
                sample_rate: 22050,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..100 {
                writer.write_sample(i16::MAX).unwrap();
                writer.write_sample(i16::MIN).unwrap();
            }
            writer.finalize().unwrap();
        }

        let audio = decode_bytes(cursor.get_ref(), None).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.samples.len(), 200);

        let mono = audio.to_mono();
        assert_eq!(mono.len(), 100);
        assert!(mono.iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn test_streamed_wav_with_oversized_length() {
        let mut bytes = vibeflow_wav::encode(&[0.5; 64], 8000).unwrap();
        bytes[40..44].copy_from_slice(&u32::MAX.to_le_bytes());

        let audio = decode_bytes(&bytes, None).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.samples.len(), 64);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            decode_bytes(&[], Some("a.wav")),
            Err(VibeflowError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_corrupt_flac_header() {
        let err = decode_bytes(b"fLaC\x00\x00", None).unwrap_err();
        assert!(matches!(err, VibeflowError::UnsupportedFormat(_)));
    }
}
