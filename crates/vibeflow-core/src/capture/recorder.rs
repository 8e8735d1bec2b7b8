//! Raw capture alongside the framed path

use crate::error::{Result, VibeflowError};
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, Sender};
use vibeflow_wav::PcmBuffer;

/// Sending half handed to the capture callback. Never blocks.
#[derive(Debug, Clone)]
pub struct RecorderTap {
    tx: Sender<Vec<f32>>,
}

impl RecorderTap {
    pub fn push(&self, samples: &[f32]) {
        // The recorder may already be finished; late samples are dropped
        let _ = self.tx.send(samples.to_vec());
    }
}

/// Accumulates device samples in their native layout
#[derive(Debug)]
pub struct Recorder {
    rx: Receiver<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
}

impl Recorder {
    pub fn new(sample_rate: u32, channels: u16) -> (Self, RecorderTap) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                rx,
                sample_rate,
                channels: channels.max(1),
            },
            RecorderTap { tx },
        )
    }

    /// Drain everything pushed so far into a [`Recording`]
    pub fn finish(self) -> Recording {
        let samples: Vec<f32> = self.rx.try_iter().flatten().collect();
        log::debug!("Recorder collected {} samples", samples.len());
        Recording {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Captured device audio, interleaved
#[derive(Debug, Clone)]
pub struct Recording {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Recording {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 32-bit float WAV in the device's native channel layout
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(hound_error)?;
        for &sample in &self.samples {
            writer.write_sample(sample).map_err(hound_error)?;
        }
        writer.finalize().map_err(hound_error)?;
        Ok(cursor.into_inner())
    }

    /// Mono PCM for analysis and matching
    pub fn to_pcm(&self) -> Result<PcmBuffer> {
        let mono = crate::audio::downmix(&self.samples, self.channels);
        Ok(PcmBuffer::new(mono, self.sample_rate)?)
    }
}

fn hound_error(err: hound::Error) -> VibeflowError {
    match err {
        hound::Error::IoError(e) => VibeflowError::Io(e),
        other => VibeflowError::Validation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_wav_is_float_stereo() {
        let (recorder, tap) = Recorder::new(48000, 2);
        tap.push(&[0.5, -0.5, 0.25, -0.25]);
        tap.push(&[1.0, 0.0]);
        drop(tap);

        let recording = recorder.finish();
        assert_eq!(recording.frames(), 3);

        let wav = recording.to_wav().unwrap();
        let reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        assert_eq!(reader.len(), 6);
    }

    #[test]
    fn test_push_after_finish_is_harmless() {
        let (recorder, tap) = Recorder::new(8000, 1);
        let recording = recorder.finish();
        assert!(recording.is_empty());
        tap.push(&[0.1; 8]);
    }

    #[test]
    fn test_to_pcm_downmixes() {
        let recording = Recording {
            samples: vec![1.0, -1.0, 0.5, 0.5],
            sample_rate: 8000,
            channels: 2,
        };
        let pcm = recording.to_pcm().unwrap();
        assert_eq!(pcm.samples().to_vec(), vec![0.0, 0.5]);
    }
}
