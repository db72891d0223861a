//! Short-time FFT analysis of audio into a dense model
//!
//! Each model column is the magnitude spectrum of one Hann-windowed block of
//! `fft_size` samples, with blocks `hop_size` samples apart. Magnitudes are
//! scaled so that a full-scale sine peaks near 0.5.

use super::GridModel;
use anyhow::{Result, anyhow};
use hound::{SampleFormat, WavReader, WavSpec};
use rustfft::{FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Block layout for spectrogram analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectrogramConfig {
    /// FFT window size in samples
    pub fft_size: usize,
    /// Distance between successive windows; this is the model resolution
    pub hop_size: usize,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            hop_size: 256,
        }
    }
}

/// Read a WAV file, averaging all channels into one
pub fn read_wav_mono(path: &Path) -> Result<(Vec<f32>, WavSpec)> {
    let mut reader = WavReader::open(path)
        .map_err(|e| anyhow!("Failed to open {}: {}", path.display(), e))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok((mono, spec))
}

/// Compute a magnitude spectrogram of `samples`
pub fn analyse(samples: &[f32], config: SpectrogramConfig) -> GridModel {
    let fft_size = config.fft_size.max(2);
    let hop_size = config.hop_size.max(1);

    // Hann window to reduce spectral leakage
    let window: Vec<f32> = (0..fft_size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / fft_size as f32).cos()))
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_size);

    let column_count = samples.len().div_ceil(hop_size);
    let bins = fft_size / 2;
    let scale = 2.0 / fft_size as f32;

    let mut buffer = vec![Complex::new(0.0, 0.0); fft_size];
    let mut columns = Vec::with_capacity(column_count);

    for column in 0..column_count {
        let start = column * hop_size;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = samples.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }

        fft.process(&mut buffer);

        columns.push(buffer[..bins].iter().map(|c| c.norm() * scale).collect());
    }

    tracing::debug!(
        columns = column_count,
        bins,
        fft_size,
        hop_size,
        "spectrogram analysed"
    );

    GridModel::from_columns(hop_size, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DenseModel;

    fn sine(frequency: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_model_dimensions() {
        let config = SpectrogramConfig {
            fft_size: 256,
            hop_size: 64,
        };
        let model = analyse(&vec![0.0; 1000], config);
        assert_eq!(model.width(), 16);
        assert_eq!(model.height(), 128);
        assert_eq!(model.resolution(), 64);
        assert!(model.is_ready());
    }

    #[test]
    fn test_silence_produces_zero_magnitudes() {
        let model = analyse(&vec![0.0; 512], SpectrogramConfig::default());
        assert_eq!(model.max_value(), 0.0);
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let config = SpectrogramConfig {
            fft_size: 512,
            hop_size: 512,
        };
        // 1 kHz at 16 kHz with 512 bins over 8 kHz lands in bin 32
        let model = analyse(&sine(1000.0, 16000.0, 2048), config);
        let column = model.column(1).unwrap();
        let peak = column
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(bin, _)| bin)
            .unwrap();
        assert_eq!(peak, 32);
        assert!(column[32] > 0.4 && column[32] < 0.6);
    }

    #[test]
    fn test_empty_input_produces_empty_model() {
        let model = analyse(&[], SpectrogramConfig::default());
        assert_eq!(model.width(), 0);
    }
}
