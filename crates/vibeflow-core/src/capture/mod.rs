//! Chunked capture stream
//!
//! An [`AudioInput`] delivers interleaved samples on its own thread. The
//! capture stream down-mixes them and fans them out to three taps: the
//! framer feeding the match session, the raw recorder and the analyser
//! feeding the visualizer.

mod device;
mod framer;
mod playback;
mod recorder;

#[cfg(feature = "mic")]
mod cpal_input;

pub use device::{AudioInput, SampleCallback};
pub use framer::{CaptureFrame, Framer};
pub use playback::PlaybackInput;
pub use recorder::{Recorder, RecorderTap, Recording};

#[cfg(feature = "mic")]
pub use cpal_input::CpalInput;

use crate::audio::downmix;
use crate::error::{Result, VibeflowError};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Ordered consumer of fixed-size frames
pub trait FrameSink: Send {
    fn push(&mut self, frame: CaptureFrame);
}

impl<F> FrameSink for F
where
    F: FnMut(CaptureFrame) + Send,
{
    fn push(&mut self, frame: CaptureFrame) {
        self(frame)
    }
}

/// Consumers attached to a running capture
#[derive(Default)]
pub struct CaptureTaps {
    pub frames: Option<Box<dyn FrameSink>>,
    pub recorder: Option<RecorderTap>,
    /// Receives the mono samples of every callback
    pub spectrum: Option<SampleCallback>,
}

impl CaptureTaps {
    pub fn with_frames(mut self, sink: impl FrameSink + 'static) -> Self {
        self.frames = Some(Box::new(sink));
        self
    }

    pub fn with_recorder(mut self, tap: RecorderTap) -> Self {
        self.recorder = Some(tap);
        self
    }

    pub fn with_spectrum(mut self, tap: impl FnMut(&[f32]) + Send + 'static) -> Self {
        self.spectrum = Some(Box::new(tap));
        self
    }
}

/// A started input with its taps wired in
pub struct CaptureStream {
    input: Box<dyn AudioInput>,
    released: bool,
}

impl CaptureStream {
    /// Start `input` and route its samples to `taps`
    pub fn start(mut input: Box<dyn AudioInput>, frame_size: usize, taps: CaptureTaps) -> Result<Self> {
        let channels = input.channels();
        let sample_rate = input.sample_rate();
        let mut framer = Framer::new(frame_size, sample_rate);

        let CaptureTaps {
            mut frames,
            recorder,
            mut spectrum,
        } = taps;

        let callback: SampleCallback = Box::new(move |data: &[f32]| {
            if let Some(tap) = &recorder {
                tap.push(data);
            }

            let mono = downmix(data, channels);
            if let Some(tap) = spectrum.as_mut() {
                tap(&mono);
            }
            if let Some(sink) = frames.as_mut() {
                for frame in framer.push(&mono) {
                    sink.push(frame);
                }
            }
        });

        input.start(callback)?;
        log::info!(
            "Capture started: {} Hz, {} channel(s), {} samples per frame",
            sample_rate,
            channels,
            frame_size
        );

        Ok(Self {
            input,
            released: false,
        })
    }

    /// [`CaptureStream::start`] on the blocking pool.
    ///
    /// Opening a device can block for a while, so async callers go through here.
    pub async fn start_blocking(
        input: Box<dyn AudioInput>,
        frame_size: usize,
        taps: CaptureTaps,
    ) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::start(input, frame_size, taps))
            .await
            .map_err(|e| VibeflowError::Internal(format!("capture start task failed: {}", e)))?
    }

    pub fn sample_rate(&self) -> u32 {
        self.input.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.input.channels()
    }

    /// Source has no more samples to deliver
    pub fn is_exhausted(&self) -> bool {
        self.input.is_exhausted()
    }

    pub fn exhaustion_flag(&self) -> Option<Arc<AtomicBool>> {
        self.input.exhaustion_flag()
    }

    /// Device error that ended delivery, if any
    pub fn failure(&self) -> Option<String> {
        self.input.failure()
    }

    /// Release the device. Returns `false` when it was already released.
    pub fn stop(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.input.stop();
        log::info!("Capture stopped");
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.released
    }

    /// Stop and drop the stream on the blocking pool; joining the
    /// delivery thread must not stall the runtime.
    pub async fn release(mut self) {
        let joined = tokio::task::spawn_blocking(move || {
            self.stop();
        })
        .await;
        if let Err(e) = joined {
            log::warn!("Capture release task failed: {}", e);
        }
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Input that delivers scripted chunks synchronously from `start`
    pub struct ScriptedInput {
        pub chunks: Vec<Vec<f32>>,
        pub channels: u16,
        pub stops: Arc<AtomicUsize>,
        /// `start` fails with this message
        pub refuse: Option<String>,
        /// Reported as the device failure once the chunks are delivered
        pub fail_after: Option<String>,
        started: bool,
    }

    impl ScriptedInput {
        pub fn new(chunks: Vec<Vec<f32>>, channels: u16) -> (Self, Arc<AtomicUsize>) {
            let stops = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    chunks,
                    channels,
                    stops: stops.clone(),
                    refuse: None,
                    fail_after: None,
                    started: false,
                },
                stops,
            )
        }

        pub fn refusing(mut self, message: &str) -> Self {
            self.refuse = Some(message.to_string());
            self
        }

        pub fn failing_after_delivery(mut self, message: &str) -> Self {
            self.fail_after = Some(message.to_string());
            self
        }
    }

    impl AudioInput for ScriptedInput {
        fn sample_rate(&self) -> u32 {
            8000
        }

        fn channels(&self) -> u16 {
            self.channels
        }

        fn start(&mut self, mut callback: SampleCallback) -> Result<()> {
            if let Some(message) = &self.refuse {
                return Err(VibeflowError::PermissionDenied(message.clone()));
            }
            for chunk in self.chunks.drain(..) {
                callback(&chunk);
            }
            self.started = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn is_exhausted(&self) -> bool {
            self.chunks.is_empty()
        }

        fn failure(&self) -> Option<String> {
            if self.started {
                self.fail_after.clone()
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedInput;
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_taps_receive_samples() {
        // Stereo chunks of 3 frames each, 8 chunks = 24 mono samples
        let chunks: Vec<Vec<f32>> = (0..8).map(|i| vec![i as f32; 6]).collect();
        let (input, stops) = ScriptedInput::new(chunks, 2);

        let frames = Arc::new(Mutex::new(Vec::new()));
        let spectrum_len = Arc::new(Mutex::new(0usize));
        let (recorder, tap) = Recorder::new(8000, 2);

        let frames_sink = frames.clone();
        let spectrum_sink = spectrum_len.clone();
        let taps = CaptureTaps::default()
            .with_frames(move |f: CaptureFrame| frames_sink.lock().unwrap().push(f))
            .with_recorder(tap)
            .with_spectrum(move |s: &[f32]| *spectrum_sink.lock().unwrap() += s.len());

        let mut stream = CaptureStream::start(Box::new(input), 10, taps).unwrap();
        assert!(stream.is_exhausted());
        assert!(stream.stop());
        assert!(!stream.stop());
        drop(stream);
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].seq, 0);
        assert_eq!(frames[1].seq, 1);
        assert_eq!(frames[0].samples[..3], [0.0, 0.0, 0.0]);
        assert_eq!(*spectrum_len.lock().unwrap(), 24);

        let recording = recorder.finish();
        assert_eq!(recording.channels, 2);
        assert_eq!(recording.samples.len(), 48);
    }

    #[tokio::test]
    async fn test_blocking_start_and_release() {
        let chunks: Vec<Vec<f32>> = (0..4).map(|_| vec![0.25; 8]).collect();
        let (input, stops) = ScriptedInput::new(chunks, 1);
        let count = Arc::new(Mutex::new(0usize));
        let sink = count.clone();
        let taps = CaptureTaps::default().with_frames(move |_: CaptureFrame| *sink.lock().unwrap() += 1);

        let stream = CaptureStream::start_blocking(Box::new(input), 8, taps).await.unwrap();
        assert_eq!(*count.lock().unwrap(), 4);
        assert!(stream.failure().is_none());

        stream.release().await;
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_device_is_permission_denied() {
        let (input, stops) = ScriptedInput::new(vec![vec![0.0; 8]], 1);
        let input = input.refusing("microphone access denied");
        let result = CaptureStream::start_blocking(Box::new(input), 8, CaptureTaps::default()).await;

        assert!(matches!(
            result,
            Err(VibeflowError::PermissionDenied(ref m)) if m == "microphone access denied"
        ));
        // Never opened, so nothing to release
        assert_eq!(stops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failure_reported_after_delivery() {
        let (input, _stops) = ScriptedInput::new(vec![vec![0.0; 8]], 1);
        let input = input.failing_after_delivery("device unplugged");
        let stream = CaptureStream::start(Box::new(input), 8, CaptureTaps::default()).unwrap();
        assert_eq!(stream.failure().as_deref(), Some("device unplugged"));
    }

    #[test]
    fn test_drop_releases_once() {
        let (input, stops) = ScriptedInput::new(vec![], 1);
        let stream = CaptureStream::start(Box::new(input), 4, CaptureTaps::default()).unwrap();
        drop(stream);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
