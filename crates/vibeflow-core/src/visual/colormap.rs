//! False-color palettes for spectral views

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMap {
    #[default]
    Inferno,
    Viridis,
    Plasma,
    Cool,
    /// Purple ramp of the compact listening visualizer
    Violet,
}

impl ColorMap {
    pub const ALL: [ColorMap; 5] = [
        ColorMap::Inferno,
        ColorMap::Viridis,
        ColorMap::Plasma,
        ColorMap::Cool,
        ColorMap::Violet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColorMap::Inferno => "inferno",
            ColorMap::Viridis => "viridis",
            ColorMap::Plasma => "plasma",
            ColorMap::Cool => "cool",
            ColorMap::Violet => "violet",
        }
    }

    /// Map an intensity in `0.0..=255.0` to RGB
    pub fn map(&self, value: f32) -> [u8; 3] {
        let t = value.clamp(0.0, 255.0) / 255.0;
        match self {
            ColorMap::Inferno => inferno(t),
            ColorMap::Viridis => viridis(t),
            ColorMap::Plasma => plasma(t),
            ColorMap::Cool => [
                channel(t * 255.0),
                channel(255.0 - t * 150.0),
                255,
            ],
            ColorMap::Violet => hsl_to_rgb(270.0 + t * 30.0, 0.8, 0.4 + t * 0.3),
        }
    }
}

/// Truncate to a byte, saturating at both ends
fn channel(v: f32) -> u8 {
    v.floor().clamp(0.0, 255.0) as u8
}

fn inferno(t: f32) -> [u8; 3] {
    let r = if t < 0.5 { t * 510.0 } else { 255.0 };
    let g = if t < 0.33 {
        0.0
    } else if t < 0.66 {
        (t - 0.33) * 765.0
    } else {
        255.0
    };
    let b = if t < 0.25 {
        t * 400.0
    } else if t < 0.5 {
        (1.0 - (t - 0.25) * 4.0) * 100.0
    } else {
        0.0
    };
    [channel(r), channel(g), channel(b)]
}

fn viridis(t: f32) -> [u8; 3] {
    let r = 68.0 + t * 120.0;
    let g = if t < 0.5 {
        1.0 + t * 380.0
    } else {
        190.0 + (t - 0.5) * 130.0
    };
    let b = if t < 0.5 {
        84.0 + t * 260.0
    } else {
        214.0 - (t - 0.5) * 360.0
    };
    [channel(r), channel(g), channel(b)]
}

fn plasma(t: f32) -> [u8; 3] {
    let r = 13.0 + t * 242.0;
    let g = if t < 0.5 {
        8.0 + t * 200.0
    } else {
        108.0 + (t - 0.5) * 294.0
    };
    let b = if t < 0.4 {
        135.0 + t * 300.0
    } else {
        255.0 - (t - 0.4) * 425.0
    };
    [channel(r), channel(g), channel(b)]
}

/// `h` in degrees, `s` and `l` in `0..=1`
fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = (h.rem_euclid(360.0)) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    [
        ((r1 + m) * 255.0).round().clamp(0.0, 255.0) as u8,
        ((g1 + m) * 255.0).round().clamp(0.0, 255.0) as u8,
        ((b1 + m) * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}

impl fmt::Display for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorMap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        ColorMap::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| format!("unknown colormap '{}'", s))
    }
}
