//! Frequency analysis for the spectral views
//!
//! Mirrors a browser analyser node: a rolling window of the latest
//! `fft_size` samples, Hann window, magnitude smoothing over time and a
//! decibel range mapped onto bytes.

use crate::config::VisualConfig;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Per-bin magnitudes of one time slice
pub type SpectralFrame = Vec<u8>;

pub struct Analyser {
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    window: Vec<f32>,
    /// Circular buffer of the latest samples
    ring: Vec<f32>,
    write_pos: usize,
    smoothed: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Analyser {
    pub fn new(fft_size: usize, smoothing: f32, min_db: f32, max_db: f32) -> Self {
        let fft_size = fft_size.max(2);
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        Self {
            fft_size,
            smoothing: smoothing.clamp(0.0, 0.999),
            min_db,
            max_db,
            window: create_hann_window(fft_size),
            ring: vec![0.0; fft_size],
            write_pos: 0,
            smoothed: vec![0.0; fft_size / 2],
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn from_config(config: &VisualConfig) -> Self {
        Self::new(config.fft_size, config.smoothing, config.min_db, config.max_db)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins produced per frame
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Feed mono samples
    pub fn push(&mut self, samples: &[f32]) {
        // Only the tail can survive in the window
        let tail = if samples.len() > self.fft_size {
            &samples[samples.len() - self.fft_size..]
        } else {
            samples
        };
        for &s in tail {
            self.ring[self.write_pos] = s;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    /// Current spectrum as bytes, advancing the smoothing state
    pub fn byte_frequency_data(&mut self) -> SpectralFrame {
        for i in 0..self.fft_size {
            let s = self.ring[(self.write_pos + i) % self.fft_size];
            self.scratch[i] = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let norm = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (k, value) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() * norm;
            *value = tau * *value + (1.0 - tau) * magnitude;
        }

        self.smoothed
            .iter()
            .map(|&m| db_to_byte(m, self.min_db, self.max_db))
            .collect()
    }

    /// Forget smoothing history and buffered samples
    pub fn reset(&mut self) {
        self.ring.iter_mut().for_each(|s| *s = 0.0);
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
        self.write_pos = 0;
    }
}

fn db_to_byte(magnitude: f32, min_db: f32, max_db: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - min_db) / (max_db - min_db);
    scaled.floor().clamp(0.0, 255.0) as u8
}

/// Create Hann window
fn create_hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}

/// Spectral frames of a whole buffer, one per `hop` samples.
///
/// No temporal smoothing is applied; every frame stands alone so hops can
/// be transformed in parallel.
pub fn analyze_buffer(samples: &[f32], config: &VisualConfig, hop: usize) -> Vec<SpectralFrame> {
    let fft_size = config.fft_size.max(2);
    let hop = hop.max(1);
    if samples.is_empty() {
        return Vec::new();
    }

    let num_frames = samples.len().saturating_sub(1) / hop + 1;
    let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
    let window = create_hann_window(fft_size);
    let norm = 1.0 / fft_size as f32;
    let (min_db, max_db) = (config.min_db, config.max_db);

    (0..num_frames)
        .into_par_iter()
        .map(|frame_idx| {
            let start = frame_idx * hop;
            let end = (start + fft_size).min(samples.len());

            let mut frame: Vec<Complex<f32>> = samples[start..end]
                .iter()
                .enumerate()
                .map(|(i, &s)| Complex::new(s * window[i], 0.0))
                .collect();
            frame.resize(fft_size, Complex::new(0.0, 0.0));

            fft.process(&mut frame);

            frame[..fft_size / 2]
                .iter()
                .map(|c| db_to_byte(c.norm() * norm, min_db, max_db))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / rate).sin())
            .collect()
    }

    #[test]
    fn test_hann_window() {
        let window = create_hann_window(512);
        assert_eq!(window.len(), 512);
        assert!((window[0] - 0.0).abs() < 0.001);
        assert!((window[256] - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_silence_is_zero() {
        let mut analyser = Analyser::new(256, 0.8, -100.0, -30.0);
        analyser.push(&[0.0; 1000]);
        let data = analyser.byte_frequency_data();
        assert_eq!(data.len(), 128);
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        // 1 kHz at 8 kHz with 256 points: bin 32
        let mut analyser = Analyser::new(256, 0.0, -100.0, 0.0);
        analyser.push(&sine(1000.0, 8000.0, 256));
        let data = analyser.byte_frequency_data();

        assert!(data[32] > data[31]);
        assert!(data[32] > data[33]);
        assert!(data[32] > 200);
        assert!(data[100] < data[32]);
    }

    #[test]
    fn test_smoothing_decays_gradually() {
        let mut analyser = Analyser::new(256, 0.8, -100.0, -30.0);
        analyser.push(&sine(1000.0, 8000.0, 256));
        for _ in 0..20 {
            analyser.byte_frequency_data();
        }
        let loud = analyser.byte_frequency_data()[32];

        analyser.push(&[0.0; 256]);
        let after_one = analyser.byte_frequency_data()[32];
        assert!(after_one > 0 && after_one <= loud);
    }

    #[test]
    fn test_analyze_buffer_frames() {
        let config = VisualConfig {
            fft_size: 256,
            ..VisualConfig::default()
        };
        let samples = sine(1000.0, 8000.0, 8000);
        let frames = analyze_buffer(&samples, &config, 256);
        assert_eq!(frames.len(), 32);
        assert!(frames.iter().all(|f| f.len() == 128));
        assert!(frames[5][32] > 200);
        assert!(analyze_buffer(&[], &config, 256).is_empty());
    }
}
