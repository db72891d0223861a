//! Dense column data behind a colour plot
//!
//! A dense model is a grid of values: one column per `resolution` frames,
//! `height` bins per column. The renderer only reads from it.

mod spectrogram;

pub use spectrogram::{SpectrogramConfig, analyse, read_wav_mono};

/// Read-only grid of analysis values
pub trait DenseModel {
    /// Whether the model can be rendered from
    fn is_ready(&self) -> bool;

    /// Percentage of the model that has been computed
    fn completion(&self) -> u8;

    /// Frame at which column 0 begins
    fn start_frame(&self) -> i64 {
        0
    }

    /// Frames covered by each column
    fn resolution(&self) -> usize;

    /// Number of columns
    fn width(&self) -> usize;

    /// Number of bins per column
    fn height(&self) -> usize;

    fn column(&self, index: usize) -> Option<&[f32]>;
}

/// In-memory dense model
#[derive(Debug, Clone)]
pub struct GridModel {
    columns: Vec<Vec<f32>>,
    resolution: usize,
    height: usize,
    start_frame: i64,
    completion: u8,
}

impl GridModel {
    /// Build a complete model; columns shorter than the tallest are zero-padded
    pub fn from_columns(resolution: usize, mut columns: Vec<Vec<f32>>) -> Self {
        let height = columns.iter().map(Vec::len).max().unwrap_or(0);
        for column in &mut columns {
            column.resize(height, 0.0);
        }
        Self {
            columns,
            resolution: resolution.max(1),
            height,
            start_frame: 0,
            completion: 100,
        }
    }

    pub fn with_start_frame(mut self, start_frame: i64) -> Self {
        self.start_frame = start_frame;
        self
    }

    /// Mark how much of the model has been computed; below 100 it is not ready
    pub fn set_completion(&mut self, completion: u8) {
        self.completion = completion.min(100);
    }

    /// Largest value anywhere in the model
    pub fn max_value(&self) -> f32 {
        self.columns
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f32::max)
    }
}

impl DenseModel for GridModel {
    fn is_ready(&self) -> bool {
        self.completion >= 100
    }

    fn completion(&self) -> u8 {
        self.completion
    }

    fn start_frame(&self) -> i64 {
        self.start_frame
    }

    fn resolution(&self) -> usize {
        self.resolution
    }

    fn width(&self) -> usize {
        self.columns.len()
    }

    fn height(&self) -> usize {
        self.height
    }

    fn column(&self, index: usize) -> Option<&[f32]> {
        self.columns.get(index).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_columns_pads_to_tallest() {
        let model = GridModel::from_columns(4, vec![vec![1.0], vec![1.0, 2.0, 3.0]]);
        assert_eq!(model.height(), 3);
        assert_eq!(model.column(0), Some(&[1.0, 0.0, 0.0][..]));
        assert_eq!(model.column(2), None);
        assert_eq!(model.max_value(), 3.0);
    }

    #[test]
    fn test_readiness_follows_completion() {
        let mut model = GridModel::from_columns(1, vec![vec![0.0]]);
        assert!(model.is_ready());
        model.set_completion(40);
        assert!(!model.is_ready());
        assert_eq!(model.completion(), 40);
    }
}
