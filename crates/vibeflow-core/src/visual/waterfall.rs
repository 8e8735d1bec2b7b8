//! Scrolling false-color spectrogram

use super::ColorMap;
use crate::config::VisualConfig;
use image::RgbImage;

/// Newest spectrum on top, older rows pushed down and off the bottom
#[derive(Debug, Clone)]
pub struct Waterfall {
    image: RgbImage,
    colormap: ColorMap,
    gain: f32,
    scroll_speed: u32,
}

impl Waterfall {
    pub fn new(width: u32, height: u32, colormap: ColorMap, gain: f32, scroll_speed: u32) -> Self {
        Self {
            image: RgbImage::new(width.max(1), height.max(1)),
            colormap,
            gain,
            scroll_speed: scroll_speed.max(1),
        }
    }

    pub fn from_config(config: &VisualConfig) -> Self {
        Self::new(
            config.width,
            config.height,
            config.colormap,
            config.gain,
            config.scroll_speed,
        )
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn set_colormap(&mut self, colormap: ColorMap) {
        self.colormap = colormap;
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }

    pub fn set_scroll_speed(&mut self, rows: u32) {
        self.scroll_speed = rows.max(1);
    }

    /// Scroll by `scroll_speed` rows and paint `data` into the freed rows
    pub fn push(&mut self, data: &[u8]) {
        let width = self.image.width() as usize;
        let height = self.image.height() as usize;
        let speed = (self.scroll_speed as usize).min(height);
        let row_len = width * 3;

        let buf: &mut [u8] = &mut self.image;
        if speed < height {
            buf.copy_within(0..(height - speed) * row_len, speed * row_len);
        }

        let bins = data.len().min(width);
        let mut row = Vec::with_capacity(row_len);
        for x in 0..width {
            let idx = x * bins / width;
            let raw = data.get(idx).copied().unwrap_or(0) as f32;
            let value = (raw * self.gain).min(255.0);
            row.extend_from_slice(&self.colormap.map(value));
        }

        for y in 0..speed {
            buf[y * row_len..(y + 1) * row_len].copy_from_slice(&row);
        }
    }

    /// Paint the whole image black
    pub fn clear(&mut self) {
        for p in self.image.pixels_mut() {
            p.0 = [0, 0, 0];
        }
    }
}
