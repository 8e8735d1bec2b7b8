//! Spectral visualizer
//!
//! Byte spectra from [`Analyser`] drive a bar view and a scrolling
//! waterfall, redrawn at display rate by [`RedrawLoop`].

mod bars;
mod colormap;
mod monitor;
mod schedule;
mod spectrum;
mod waterfall;

pub use bars::{BarRenderer, MAX_BARS};
pub use colormap::ColorMap;
pub use monitor::{MonitorCapture, SpectrogramMonitor};
pub use schedule::RedrawLoop;
pub use spectrum::{analyze_buffer, Analyser, SpectralFrame};
pub use waterfall::Waterfall;

use crate::error::Result;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Encode an image as PNG bytes
pub fn encode_png(image: impl Into<DynamicImage>) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.into().write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Write an image to `path` as PNG
pub fn save_png(image: impl Into<DynamicImage>, path: &Path) -> Result<()> {
    image.into().save_with_format(path, ImageFormat::Png)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Render a whole buffer as a static waterfall, oldest slice at the bottom
pub fn render_waterfall(frames: &[SpectralFrame], waterfall: &mut Waterfall) {
    for frame in frames {
        waterfall.push(frame);
    }
}
