//! Bar spectrum

use super::ColorMap;
use crate::config::VisualConfig;
use image::{Rgba, RgbaImage};

/// Widest spectrum drawn as bars
pub const MAX_BARS: usize = 256;

#[derive(Debug, Clone)]
pub struct BarRenderer {
    width: u32,
    height: u32,
    colormap: ColorMap,
    gain: f32,
}

impl BarRenderer {
    pub fn new(width: u32, height: u32, colormap: ColorMap, gain: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            colormap,
            gain,
        }
    }

    pub fn from_config(config: &VisualConfig) -> Self {
        Self::new(config.width, config.height, config.colormap, config.gain)
    }

    pub fn set_colormap(&mut self, colormap: ColorMap) {
        self.colormap = colormap;
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }

    /// Draw one frame on a transparent canvas.
    ///
    /// Bar `i` shows `min(255, data[i] * gain)`, grows from the bottom and
    /// leaves a one pixel gap to its right neighbour.
    pub fn render(&self, data: &[u8]) -> RgbaImage {
        let mut img = RgbaImage::new(self.width, self.height);
        let bar_count = data.len().min(MAX_BARS);
        if bar_count == 0 {
            return img;
        }

        let w = self.width as f32;
        let h = self.height as f32;
        let bar_w = w / bar_count as f32;

        for (i, &raw) in data.iter().take(bar_count).enumerate() {
            let value = (raw as f32 * self.gain).min(255.0);
            let bar_h = ((value / 255.0) * h).round() as u32;
            if bar_h == 0 {
                continue;
            }

            let x0 = (i as f32 * bar_w).round() as u32;
            let x1 = ((i as f32 * bar_w + bar_w - 1.0).round() as u32).min(self.width);
            let [r, g, b] = self.colormap.map(value);
            let color = Rgba([r, g, b, 255]);

            for x in x0..x1 {
                for y in self.height - bar_h.min(self.height)..self.height {
                    img.put_pixel(x, y, color);
                }
            }
        }
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_geometry() {
        let renderer = BarRenderer::new(40, 10, ColorMap::Cool, 1.0);
        // Four bars of 10 px: full, half, empty, full
        let img = renderer.render(&[255, 128, 0, 255]);

        // Full bar spans columns 0..9, column 9 is the gap
        assert_eq!(img.get_pixel(0, 0)[3], 255);
        assert_eq!(img.get_pixel(8, 0)[3], 255);
        assert_eq!(img.get_pixel(9, 0)[3], 0);
        assert_eq!(img.get_pixel(0, 0).0[..3], ColorMap::Cool.map(255.0));

        // Half bar fills the lower five rows
        assert_eq!(img.get_pixel(12, 4)[3], 0);
        assert_eq!(img.get_pixel(12, 5)[3], 255);

        // Empty bar draws nothing
        assert!((20..30).all(|x| img.get_pixel(x, 9)[3] == 0));
    }

    #[test]
    fn test_gain_saturates() {
        let renderer = BarRenderer::new(20, 10, ColorMap::Inferno, 4.0);
        let img = renderer.render(&[100, 0]);
        assert_eq!(img.get_pixel(0, 0)[3], 255);
        assert_eq!(img.get_pixel(0, 0).0[..3], ColorMap::Inferno.map(255.0));
    }

    #[test]
    fn test_caps_bar_count() {
        let renderer = BarRenderer::new(512, 4, ColorMap::Viridis, 1.0);
        let img = renderer.render(&vec![255u8; 1024]);
        // 256 bars of 2 px: one lit column, one gap
        assert_eq!(img.get_pixel(510, 0)[3], 255);
        assert_eq!(img.get_pixel(511, 0)[3], 0);
    }

    #[test]
    fn test_empty_data() {
        let renderer = BarRenderer::new(8, 8, ColorMap::Plasma, 1.0);
        let img = renderer.render(&[]);
        assert!(img.pixels().all(|p| p[3] == 0));
    }
}
