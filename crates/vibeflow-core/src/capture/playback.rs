//! Buffer playback as a live input
//!
//! Used for file playback in the spectrogram view and to simulate a
//! microphone when no device is available.

use super::device::{AudioInput, SampleCallback};
use crate::error::{Result, VibeflowError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use vibeflow_wav::PcmBuffer;

/// Frames per callback, matching a typical device buffer
const DEFAULT_CHUNK_FRAMES: usize = 1024;

pub struct PlaybackInput {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
    chunk_frames: usize,
    realtime: bool,
    stop: Arc<AtomicBool>,
    exhausted: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackInput {
    /// Interleaved samples with `channels` per frame
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
            channels: channels.max(1),
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            realtime: true,
            stop: Arc::new(AtomicBool::new(false)),
            exhausted: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn from_pcm(pcm: &PcmBuffer) -> Self {
        Self::new(pcm.samples().to_vec(), pcm.sample_rate(), 1)
    }

    pub fn with_chunk_frames(mut self, frames: usize) -> Self {
        self.chunk_frames = frames.max(1);
        self
    }

    /// Pace delivery at the buffer's sample rate (default) or as fast as possible
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}

impl AudioInput for PlaybackInput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn start(&mut self, mut callback: SampleCallback) -> Result<()> {
        if self.worker.is_some() {
            return Err(VibeflowError::Validation(
                "playback already started".to_string(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(VibeflowError::Validation(
                "playback sample rate must be > 0".to_string(),
            ));
        }

        let samples = self.samples.clone();
        let stop = self.stop.clone();
        let exhausted = self.exhausted.clone();
        let chunk_len = self.chunk_frames * self.channels as usize;
        let chunk_duration =
            Duration::from_secs_f64(self.chunk_frames as f64 / self.sample_rate as f64);
        let realtime = self.realtime;

        let handle = thread::Builder::new()
            .name("vibeflow-playback".to_string())
            .spawn(move || {
                let started = Instant::now();
                for (i, chunk) in samples.chunks(chunk_len).enumerate() {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    callback(chunk);

                    if realtime {
                        // Absolute deadlines keep pacing free of drift
                        let deadline = started + chunk_duration * (i as u32 + 1);
                        let now = Instant::now();
                        if deadline > now {
                            thread::sleep(deadline - now);
                        }
                    }
                }
                exhausted.store(true, Ordering::SeqCst);
                log::debug!("Playback finished");
            })?;

        self.worker = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::warn!("Playback thread panicked");
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    fn exhaustion_flag(&self) -> Option<Arc<AtomicBool>> {
        Some(self.exhausted.clone())
    }
}

impl Drop for PlaybackInput {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_delivers_everything_in_order() {
        let samples: Vec<f32> = (0..5000).map(|i| i as f32).collect();
        let mut input = PlaybackInput::new(samples.clone(), 8000, 1)
            .with_chunk_frames(512)
            .realtime(false);

        let (tx, rx) = mpsc::channel();
        input
            .start(Box::new(move |chunk: &[f32]| {
                let _ = tx.send(chunk.to_vec());
            }))
            .unwrap();

        let received: Vec<f32> = rx.iter().flatten().collect();
        assert_eq!(received, samples);
        assert!(input.is_exhausted());
        input.stop();
    }

    #[test]
    fn test_stop_interrupts_realtime_playback() {
        // Ten seconds of audio, stopped almost immediately
        let mut input = PlaybackInput::new(vec![0.0; 80_000], 8000, 1).with_chunk_frames(800);
        input.start(Box::new(|_: &[f32]| {})).unwrap();

        let started = Instant::now();
        input.stop();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!input.is_exhausted() || input.worker.is_none());
    }

    #[test]
    fn test_double_start_rejected() {
        let mut input = PlaybackInput::new(vec![0.0; 16], 8000, 1).realtime(false);
        input.start(Box::new(|_: &[f32]| {})).unwrap();
        assert!(input.start(Box::new(|_: &[f32]| {})).is_err());
    }
}
