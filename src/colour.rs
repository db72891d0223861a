//! Value to pixel colour mapping

use serde::{Deserialize, Serialize};
use tiny_skia::{ColorU8, PremultipliedColorU8};

/// Named colour gradients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ColourMap {
    #[default]
    Green,
    WhiteOnBlack,
    BlackOnWhite,
    Sunset,
}

impl ColourMap {
    fn stops(&self) -> &'static [[u8; 3]] {
        match self {
            ColourMap::Green => &[
                [0, 0, 0],
                [0, 64, 0],
                [32, 160, 32],
                [160, 255, 96],
                [255, 255, 220],
            ],
            ColourMap::WhiteOnBlack => &[[0, 0, 0], [255, 255, 255]],
            ColourMap::BlackOnWhite => &[[255, 255, 255], [0, 0, 0]],
            ColourMap::Sunset => &[
                [0, 0, 0],
                [64, 0, 96],
                [192, 32, 64],
                [255, 128, 0],
                [255, 255, 160],
            ],
        }
    }

    /// Colour at position `t` in [0, 1] along the gradient
    pub fn colour(&self, t: f32) -> ColorU8 {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let position = t * (stops.len() - 1) as f32;
        let index = (position.floor() as usize).min(stops.len() - 2);
        let frac = position - index as f32;

        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * frac).round() as u8;
        let (a, b) = (stops[index], stops[index + 1]);
        ColorU8::from_rgba(lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]), 255)
    }
}

/// How values are spread across the colour map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ColourScaleType {
    Linear,
    #[default]
    Log,
}

/// Maps analysis values to pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourScale {
    pub map: ColourMap,
    pub scale: ColourScaleType,
    pub gain: f32,
    /// Value shown at the top of the map on a linear scale
    pub max_value: f32,
    /// Level shown at the bottom of the map on a log scale
    pub floor_db: f32,
}

impl Default for ColourScale {
    fn default() -> Self {
        Self {
            map: ColourMap::default(),
            scale: ColourScaleType::default(),
            gain: 1.0,
            max_value: 1.0,
            floor_db: -80.0,
        }
    }
}

impl ColourScale {
    /// Position of `value` along the colour map, in [0, 1]
    pub fn position(&self, value: f32) -> f32 {
        let value = value * self.gain;
        let t = match self.scale {
            ColourScaleType::Linear => {
                if self.max_value <= 0.0 {
                    0.0
                } else {
                    value / self.max_value
                }
            }
            ColourScaleType::Log => {
                if value <= 0.0 {
                    0.0
                } else {
                    let db = 20.0 * value.log10();
                    (db - self.floor_db) / -self.floor_db
                }
            }
        };
        if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
    }

    pub fn pixel(&self, value: f32) -> PremultipliedColorU8 {
        self.map.colour(self.position(value)).premultiply()
    }
}
