//! Per-column magnitude extents for a scrolling view

use super::CacheError;
use crate::geometry::{LayerGeometryProvider, ProviderId, ZoomLevel};

/// Accumulated low/high extent of the values behind one column
///
/// An unset range means no value has been sampled yet; it is distinct from a
/// range that happens to hold zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MagnitudeRange {
    extent: Option<(f32, f32)>,
}

impl MagnitudeRange {
    pub fn new(low: f32, high: f32) -> Self {
        Self {
            extent: Some((low.min(high), low.max(high))),
        }
    }

    pub fn is_set(&self) -> bool {
        self.extent.is_some()
    }

    pub fn low(&self) -> Option<f32> {
        self.extent.map(|(low, _)| low)
    }

    pub fn high(&self) -> Option<f32> {
        self.extent.map(|(_, high)| high)
    }

    /// Widen the range to include `value`; NaN is ignored
    pub fn sample_value(&mut self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.extent = Some(match self.extent {
            None => (value, value),
            Some((low, high)) => (low.min(value), high.max(value)),
        });
    }

    /// Widen the range to include `other`
    pub fn sample(&mut self, other: &MagnitudeRange) {
        if let Some((low, high)) = other.extent {
            self.sample_value(low);
            self.sample_value(high);
        }
    }
}

/// One `MagnitudeRange` per pixel column of the viewport
///
/// There is no separate validity flag: a column that has not been sampled since
/// it scrolled into view holds an unset range.
#[derive(Debug, Default)]
pub struct MagnitudeRangeCache {
    columns: Vec<MagnitudeRange>,
    start_frame: i64,
    zoom_level: Option<ZoomLevel>,
    provider: Option<ProviderId>,
}

impl MagnitudeRangeCache {
    pub fn new(width: usize) -> Self {
        Self {
            columns: vec![MagnitudeRange::default(); width],
            ..Self::default()
        }
    }

    pub fn with_provider(width: usize, provider: ProviderId) -> Self {
        Self {
            provider: Some(provider),
            ..Self::new(width)
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn start_frame(&self) -> i64 {
        self.start_frame
    }

    pub fn provider(&self) -> Option<ProviderId> {
        self.provider
    }

    pub fn set_provider(&mut self, provider: ProviderId) {
        if self.provider != Some(provider) {
            self.provider = Some(provider);
            self.invalidate();
        }
    }

    pub fn zoom_level(&self) -> Option<ZoomLevel> {
        self.zoom_level
    }

    pub fn set_zoom_level(&mut self, zoom: ZoomLevel) {
        if self.zoom_level != Some(zoom) {
            self.zoom_level = Some(zoom);
            self.invalidate();
        }
    }

    pub fn resize(&mut self, width: usize) {
        self.columns = vec![MagnitudeRange::default(); width];
    }

    pub fn invalidate(&mut self) {
        self.columns.fill(MagnitudeRange::default());
    }

    /// Realign the columns with a new start frame
    ///
    /// Columns are only moved when the visible pixel displacement is non-zero;
    /// the columns scrolled into view start out unset.
    pub fn scroll_to(
        &mut self,
        v: &dyn LayerGeometryProvider,
        new_start_frame: i64,
    ) -> Result<(), CacheError> {
        let Some(provider) = self.provider else {
            return Err(CacheError::NoGeometryProvider);
        };
        if provider != v.id() {
            tracing::debug!("magnitude cache moved to a new geometry provider");
            self.set_provider(v.id());
        }

        let dx = v.x_for_frame(self.start_frame) as i64 - v.x_for_frame(new_start_frame) as i64;
        self.start_frame = new_start_frame;

        if dx == 0 {
            return Ok(());
        }

        let width = self.width();
        if dx.unsigned_abs() >= width as u64 {
            self.invalidate();
            return Ok(());
        }

        let shift = dx.unsigned_abs() as usize;
        let mut shifted = Vec::with_capacity(width);
        if dx < 0 {
            shifted.extend_from_slice(&self.columns[shift..]);
            shifted.resize(width, MagnitudeRange::default());
        } else {
            shifted.resize(shift, MagnitudeRange::default());
            shifted.extend_from_slice(&self.columns[..width - shift]);
        }
        self.columns = shifted;

        Ok(())
    }

    fn index(&self, column: i64) -> Result<usize, CacheError> {
        if column < 0 || column >= self.width() as i64 {
            return Err(CacheError::ColumnOutOfRange {
                column,
                width: self.width(),
            });
        }
        Ok(column as usize)
    }

    /// Merge `range` into the accumulator for `column`
    pub fn sample_column(&mut self, column: i32, range: &MagnitudeRange) -> Result<(), CacheError> {
        let index = self.index(column as i64)?;
        self.columns[index].sample(range);
        Ok(())
    }

    /// Merge `range` into the column showing `frame`
    pub fn sample_frame(
        &mut self,
        frame: i64,
        range: &MagnitudeRange,
        v: &dyn LayerGeometryProvider,
    ) -> Result<(), CacheError> {
        match self.provider {
            None => return Err(CacheError::NoGeometryProvider),
            Some(provider) if provider != v.id() => return Err(CacheError::ProviderMismatch),
            Some(_) => {}
        }
        let column = v.x_for_frame(frame) as i64 - v.x_for_frame(self.start_frame) as i64;
        let index = self.index(column)?;
        self.columns[index].sample(range);
        Ok(())
    }

    pub fn range_at(&self, column: i32) -> Result<MagnitudeRange, CacheError> {
        let index = self.index(column as i64)?;
        Ok(self.columns[index])
    }

    /// Merged range of columns `left..left + width`
    pub fn range_over(&self, left: i32, width: usize) -> Result<MagnitudeRange, CacheError> {
        let mut merged = MagnitudeRange::default();
        if width == 0 {
            return Ok(merged);
        }
        let start = self.index(left as i64)?;
        let end = self.index(left as i64 + width as i64 - 1)? + 1;
        for range in &self.columns[start..end] {
            merged.sample(range);
        }
        Ok(merged)
    }
}
