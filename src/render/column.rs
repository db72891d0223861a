//! Values behind one pixel column

use super::{BinScale, Normalization, Parameters};
use crate::cache::MagnitudeRange;
use crate::geometry::LayerGeometryProvider;
use crate::model::DenseModel;

/// Reduces the model columns and bins under a pixel column to one value per row
pub(super) struct ColumnSampler<'a> {
    model: &'a dyn DenseModel,
    params: &'a Parameters,
    rows: usize,
    peaks: Vec<f32>,
}

impl<'a> ColumnSampler<'a> {
    pub fn new(model: &'a dyn DenseModel, params: &'a Parameters, rows: usize) -> Self {
        Self {
            model,
            params,
            rows,
            peaks: vec![0.0; model.height()],
        }
    }

    /// Model columns under pixel column `x`, clipped to the model
    fn model_columns(&self, v: &dyn LayerGeometryProvider, x: i32) -> Option<(usize, usize)> {
        let resolution = self.model.resolution().max(1) as i64;
        let origin = self.model.start_frame();
        let first = (v.frame_for_x(x) - origin).div_euclid(resolution);
        let mut end = (v.frame_for_x(x + 1) - origin).div_euclid(resolution);
        if end <= first {
            end = first + 1;
        }

        let first = first.max(0);
        let end = end.min(self.model.width() as i64);
        if end <= first {
            return None;
        }
        Some((first as usize, end as usize))
    }

    /// Bins `(first, end)` shown in display row `row` (0 = top)
    fn bins_for_row(&self, row: usize) -> (usize, usize) {
        let bins = self.model.height();
        let rows = self.rows;
        let r = if self.params.invert_vertical {
            row
        } else {
            rows - 1 - row
        };

        match self.params.bin_scale {
            BinScale::Linear => {
                let first = r * bins / rows;
                let end = ((r + 1) * bins / rows).max(first + 1);
                (first, end.min(bins))
            }
            BinScale::Log => {
                let at = |p: f32| (bins as f32).powf(p).floor() as usize;
                let first = if r == 0 { 0 } else { at(r as f32 / rows as f32) };
                let end = at((r + 1) as f32 / rows as f32).max(first + 1);
                (first.min(bins - 1), end.min(bins))
            }
        }
    }

    /// Fill `out` (one slot per row) for pixel column `x`
    ///
    /// Returns `None`, leaving `out` untouched, when the column lies outside the
    /// model.
    pub fn sample(
        &mut self,
        v: &dyn LayerGeometryProvider,
        x: i32,
        out: &mut [f32],
    ) -> Option<MagnitudeRange> {
        if self.model.height() == 0 || self.rows == 0 {
            return None;
        }
        let (first, end) = self.model_columns(v, x)?;

        // peak-pick across model columns
        self.peaks.fill(0.0);
        for index in first..end {
            let Some(column) = self.model.column(index) else {
                continue;
            };
            for (peak, &value) in self.peaks.iter_mut().zip(column) {
                *peak = peak.max(value);
            }
        }

        if self.params.normalization == Normalization::Column {
            let max = self.peaks.iter().copied().fold(0.0, f32::max);
            if max > 0.0 {
                for peak in &mut self.peaks {
                    *peak /= max;
                }
            }
        }

        let mut range = MagnitudeRange::default();
        for (row, slot) in out.iter_mut().enumerate().take(self.rows) {
            let (first_bin, end_bin) = self.bins_for_row(row);
            let value = self.peaks[first_bin..end_bin]
                .iter()
                .copied()
                .fold(0.0, f32::max);
            range.sample_value(value);
            *slot = value;
        }

        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Viewport, ZoomLevel};
    use crate::model::GridModel;

    fn model() -> GridModel {
        // column c has value c + 1 in bin c % 4
        let columns = (0..8)
            .map(|c| {
                let mut column = vec![0.0; 4];
                column[c % 4] = c as f32 + 1.0;
                column
            })
            .collect();
        GridModel::from_columns(10, columns)
    }

    #[test]
    fn test_one_model_column_per_pixel() {
        let model = model();
        let params = Parameters::default();
        let mut sampler = ColumnSampler::new(&model, &params, 4);
        let viewport = Viewport::new(8, 4, ZoomLevel::FramesPerPixel(10));

        let mut out = vec![0.0; 4];
        let range = sampler.sample(&viewport, 2, &mut out).unwrap();
        // bin 2 is row 1 counting from the top
        assert_eq!(out, vec![0.0, 3.0, 0.0, 0.0]);
        assert_eq!(range, MagnitudeRange::new(0.0, 3.0));
    }

    #[test]
    fn test_peak_picks_across_columns() {
        let model = model();
        let params = Parameters::default();
        let mut sampler = ColumnSampler::new(&model, &params, 4);
        let viewport = Viewport::new(4, 4, ZoomLevel::FramesPerPixel(40));

        let mut out = vec![0.0; 4];
        sampler.sample(&viewport, 1, &mut out).unwrap();
        // pixel 1 covers model columns 4..8
        assert_eq!(out, vec![8.0, 7.0, 6.0, 5.0]);
    }

    #[test]
    fn test_outside_model_is_none() {
        let model = model();
        let params = Parameters::default();
        let mut sampler = ColumnSampler::new(&model, &params, 4);
        let mut viewport = Viewport::new(4, 4, ZoomLevel::FramesPerPixel(10));
        viewport.set_start_frame(-30);

        let mut out = vec![9.0; 4];
        assert!(sampler.sample(&viewport, 0, &mut out).is_none());
        assert_eq!(out, vec![9.0; 4]);
        assert!(sampler.sample(&viewport, 3, &mut out).is_some());
        assert!(sampler.sample(&viewport, 20, &mut out).is_none());
    }

    #[test]
    fn test_model_start_frame_offsets_columns() {
        let model = model().with_start_frame(20);
        let params = Parameters::default();
        let mut sampler = ColumnSampler::new(&model, &params, 4);
        let viewport = Viewport::new(8, 4, ZoomLevel::FramesPerPixel(10));

        let mut out = vec![0.0; 4];
        assert!(sampler.sample(&viewport, 1, &mut out).is_none());
        sampler.sample(&viewport, 2, &mut out).unwrap();
        // pixel 2 now shows model column 0
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_column_normalization_and_inversion() {
        let model = model();
        let params = Parameters {
            normalization: Normalization::Column,
            invert_vertical: true,
            ..Parameters::default()
        };
        let mut sampler = ColumnSampler::new(&model, &params, 4);
        let viewport = Viewport::new(8, 4, ZoomLevel::FramesPerPixel(10));

        let mut out = vec![0.0; 4];
        sampler.sample(&viewport, 1, &mut out).unwrap();
        assert_eq!(out, vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zoomed_in_repeats_model_column() {
        let model = model();
        let params = Parameters::default();
        let mut sampler = ColumnSampler::new(&model, &params, 4);
        let viewport = Viewport::new(8, 4, ZoomLevel::PixelsPerFrame(1));

        let mut first = vec![0.0; 4];
        let mut second = vec![0.0; 4];
        sampler.sample(&viewport, 0, &mut first).unwrap();
        sampler.sample(&viewport, 9, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_log_bins_cover_every_row() {
        let columns = vec![(0..64).map(|b| b as f32).collect()];
        let model = GridModel::from_columns(1, columns);
        let params = Parameters {
            bin_scale: BinScale::Log,
            ..Parameters::default()
        };
        let sampler = ColumnSampler::new(&model, &params, 16);
        for row in 0..16 {
            let (first, end) = sampler.bins_for_row(row);
            assert!(first < end && end <= 64);
        }
        assert_eq!(sampler.bins_for_row(15).0, 0);
        assert_eq!(sampler.bins_for_row(0).1, 64);
    }
}
