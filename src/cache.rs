//! Scrollable viewport caches
//!
//! Two backing stores that each cover exactly the current viewport and are
//! patched incrementally as the view scrolls:
//! - `image`: rendered pixels plus the single contiguous run of columns known
//!   to be correct
//! - `magnitude`: a running min/max of the analysis values behind each column
//!
//! Both are indexed by pixel column, so they only move when the visible pixel
//! displacement is non-zero. Misuse (a column outside the buffer, an image of
//! the wrong height, a scroll with no associated provider) is reported as a
//! `CacheError` and never clamped.

use thiserror::Error;

mod image;
mod magnitude;
mod valid_interval;

pub use image::PixelImageCache;
pub use magnitude::{MagnitudeRange, MagnitudeRangeCache};
pub use valid_interval::ValidInterval;

/// Cache contract violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Column {column} is outside cache of width {width}")]
    ColumnOutOfRange { column: i64, width: usize },
    #[error("Source image height {actual} does not match cache height {expected}")]
    HeightMismatch { expected: u32, actual: u32 },
    #[error("Draw span at {left} (width {width}) is outside cache of width {total}")]
    DrawOutOfBounds { left: i64, width: usize, total: usize },
    #[error("Source span at {left} (width {width}) is outside source image of width {total}")]
    SourceOutOfBounds { left: i64, width: usize, total: usize },
    #[error("Cache has no associated geometry provider")]
    NoGeometryProvider,
    #[error("Geometry provider does not match the one the cache belongs to")]
    ProviderMismatch,
}
