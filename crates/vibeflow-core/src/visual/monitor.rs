//! Live spectrogram view
//!
//! Visualizes a microphone or a file being played back while recording
//! the raw device audio, and hands both back when stopped.

use super::{Analyser, BarRenderer, ColorMap, RedrawLoop, Waterfall};
use crate::capture::{AudioInput, CaptureStream, CaptureTaps, Recorder, Recording};
use crate::config::VisualConfig;
use crate::error::{Result, VibeflowError};
use crate::teardown::Teardown;
use image::{RgbImage, RgbaImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const END_POLL: Duration = Duration::from_millis(50);

/// Images and audio collected by a finished monitor run
#[derive(Debug, Clone)]
pub struct MonitorCapture {
    pub bars: RgbaImage,
    pub waterfall: RgbImage,
    pub recording: Recording,
    pub frames_drawn: u64,
}

struct SpectrumView {
    analyser: Analyser,
    bars: BarRenderer,
    waterfall: Waterfall,
    last_bars: RgbaImage,
}

impl SpectrumView {
    fn new(config: &VisualConfig) -> Self {
        Self {
            analyser: Analyser::from_config(config),
            bars: BarRenderer::from_config(config),
            waterfall: Waterfall::from_config(config),
            last_bars: RgbaImage::new(config.width.max(1), config.height.max(1)),
        }
    }

    fn draw(&mut self) {
        let data = self.analyser.byte_frequency_data();
        self.last_bars = self.bars.render(&data);
        self.waterfall.push(&data);
    }
}

fn lock(view: &Mutex<SpectrumView>) -> MutexGuard<'_, SpectrumView> {
    view.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Running {
    teardown: Teardown,
    recorder: Recorder,
    view: Arc<Mutex<SpectrumView>>,
    ended: Option<Arc<AtomicBool>>,
}

pub struct SpectrogramMonitor {
    config: VisualConfig,
    running: Option<Running>,
}

impl SpectrogramMonitor {
    pub fn new(config: VisualConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start visualizing and recording `input`
    pub async fn start(&mut self, input: Box<dyn AudioInput>) -> Result<()> {
        if self.running.is_some() {
            return Err(VibeflowError::Validation(
                "the monitor is already running".to_string(),
            ));
        }

        let view = Arc::new(Mutex::new(SpectrumView::new(&self.config)));
        let (recorder, recorder_tap) = Recorder::new(input.sample_rate(), input.channels());

        let feed = view.clone();
        let taps = CaptureTaps::default()
            .with_recorder(recorder_tap)
            .with_spectrum(move |samples: &[f32]| lock(&feed).analyser.push(samples));

        let capture = CaptureStream::start_blocking(input, self.config.fft_size, taps).await?;
        let ended = capture.exhaustion_flag();

        let draw = view.clone();
        let source_ended = ended.clone();
        let redraw = RedrawLoop::start(self.config.fps, move || {
            lock(&draw).draw();
            !source_ended
                .as_ref()
                .map_or(false, |flag| flag.load(Ordering::SeqCst))
        });

        let mut teardown = Teardown::new();
        teardown.set_capture(capture);
        teardown.set_redraw(redraw);

        self.running = Some(Running {
            teardown,
            recorder,
            view,
            ended,
        });
        Ok(())
    }

    /// The source has run out of samples
    pub fn source_ended(&self) -> bool {
        match &self.running {
            Some(running) => running
                .ended
                .as_ref()
                .map_or(false, |flag| flag.load(Ordering::SeqCst)),
            None => true,
        }
    }

    /// Resolve once the source has ended; live inputs only end on error
    pub async fn wait_until_ended(&self) {
        while !self.source_ended() {
            tokio::time::sleep(END_POLL).await;
        }
    }

    pub fn set_colormap(&mut self, colormap: ColorMap) {
        self.config.colormap = colormap;
        if let Some(running) = &self.running {
            let mut view = lock(&running.view);
            view.bars.set_colormap(colormap);
            view.waterfall.set_colormap(colormap);
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.config.gain = gain;
        if let Some(running) = &self.running {
            let mut view = lock(&running.view);
            view.bars.set_gain(gain);
            view.waterfall.set_gain(gain);
        }
    }

    pub fn set_scroll_speed(&mut self, rows: u32) {
        self.config.scroll_speed = rows;
        if let Some(running) = &self.running {
            lock(&running.view).waterfall.set_scroll_speed(rows);
        }
    }

    /// Current bar and waterfall images
    pub fn snapshot(&self) -> Option<(RgbaImage, RgbImage)> {
        self.running.as_ref().map(|running| {
            let view = lock(&running.view);
            (view.last_bars.clone(), view.waterfall.image().clone())
        })
    }

    /// Tear down and return what was drawn and recorded
    pub async fn stop(&mut self) -> Result<MonitorCapture> {
        let mut running = self
            .running
            .take()
            .ok_or_else(|| VibeflowError::Validation("the monitor is not running".to_string()))?;

        running.teardown.run().await;
        let frames_drawn = running
            .teardown
            .take_redraw()
            .map(|redraw| redraw.ticks())
            .unwrap_or(0);

        let recording = running.recorder.finish();
        let view = lock(&running.view);
        log::info!(
            "Monitor stopped: {} frames drawn, {:.1}s recorded",
            frames_drawn,
            recording.duration_secs()
        );

        Ok(MonitorCapture {
            bars: view.last_bars.clone(),
            waterfall: view.waterfall.image().clone(),
            recording,
            frames_drawn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PlaybackInput;
    use std::f32::consts::PI;

    fn small_config() -> VisualConfig {
        VisualConfig {
            fft_size: 256,
            width: 64,
            height: 32,
            fps: 50,
            colormap: ColorMap::Cool,
            ..VisualConfig::default()
        }
    }

    #[tokio::test]
    async fn test_file_playback_run() {
        // Half a second of 1 kHz at 8 kHz
        let tone: Vec<f32> = (0..4000)
            .map(|i| (2.0 * PI * 1000.0 * i as f32 / 8000.0).sin() * 0.5)
            .collect();
        let input = PlaybackInput::new(tone, 8000, 1).with_chunk_frames(256);

        let mut monitor = SpectrogramMonitor::new(small_config());
        monitor.start(Box::new(input)).await.unwrap();
        assert!(monitor
            .start(Box::new(PlaybackInput::new(vec![], 8000, 1)))
            .await
            .is_err());

        monitor.wait_until_ended().await;
        let capture = monitor.stop().await.unwrap();

        assert!(!monitor.is_running());
        assert!(capture.frames_drawn > 0);
        assert_eq!(capture.recording.samples.len(), 4000);
        assert_eq!(capture.bars.dimensions(), (64, 32));
        assert_eq!(capture.waterfall.dimensions(), (64, 32));
        // The top waterfall row is cyan (Cool at zero) or brighter, never the black background
        assert!((0..64).all(|x| capture.waterfall.get_pixel(x, 0).0 != [0, 0, 0]));

        assert!(monitor.stop().await.is_err());
    }

    #[tokio::test]
    async fn test_stop_mid_playback() {
        let input = PlaybackInput::new(vec![0.1; 80_000], 8000, 1);
        let mut monitor = SpectrogramMonitor::new(small_config());
        monitor.start(Box::new(input)).await.unwrap();
        monitor.set_gain(2.0);
        monitor.set_colormap(ColorMap::Plasma);
        assert!(monitor.snapshot().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        let capture = monitor.stop().await.unwrap();
        assert!(!capture.recording.is_empty());
        assert!(capture.recording.samples.len() < 80_000);
    }
}
