//! Cached colour-plot rendering
//!
//! `PlotRenderer` keeps a pixel cache and a magnitude cache aligned with the
//! view and fills in whatever columns are missing, either all at once
//! (`render`) or until a time budget runs out (`render_time_constrained`).

use crate::cache::{CacheError, MagnitudeRange};
use crate::colour::ColourScale;
use crate::geometry::Rect;
use crate::model::DenseModel;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

mod column;
mod renderer;

pub use renderer::PlotRenderer;

/// Vertical distribution of model bins over pixel rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BinScale {
    #[default]
    Linear,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    #[default]
    None,
    /// Scale each column so its peak is 1
    Column,
}

/// How a plot is drawn
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub colour_scale: ColourScale,
    pub bin_scale: BinScale,
    pub normalization: Normalization,
    /// Put the lowest bin at the top instead of the bottom
    pub invert_vertical: bool,
    pub time_budget: Duration,
    pub min_columns: usize,
    pub middle_start_fraction: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            colour_scale: ColourScale::default(),
            bin_scale: BinScale::default(),
            normalization: Normalization::default(),
            invert_vertical: false,
            time_budget: Duration::from_millis(100),
            min_columns: 4,
            middle_start_fraction: 0.3,
        }
    }
}

/// Data a renderer draws from
#[derive(Clone, Default)]
pub struct Sources {
    pub model: Option<Rc<dyn DenseModel>>,
}

impl Sources {
    pub fn new(model: Rc<dyn DenseModel>) -> Self {
        Self { model: Some(model) }
    }
}

/// Outcome of a render call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderResult {
    /// Part of the requested rect that now holds correct pixels
    pub rendered: Rect,
    /// Magnitude extent of the rendered columns
    pub range: MagnitudeRange,
}

/// Render error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("No source model provided")]
    NoModel,
    #[error("Source model not ready ({completion}% complete)")]
    ModelNotReady { completion: u8 },
    #[error("View has no paintable area ({width}x{height})")]
    EmptyViewport { width: u32, height: u32 },
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}
