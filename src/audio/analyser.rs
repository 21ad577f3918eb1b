use anyhow::{bail, Result};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::Arc;

/// Analysis window used by the visualizer.
pub const FFT_SIZE: usize = 2048;
pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

/// Spectrum analyser producing byte-scaled frequency bins.
///
/// Keeps the most recent `fft_size` mono samples. Each read applies a
/// Blackman window, takes the FFT, smooths magnitudes against the previous
/// read, and maps the decibel range [`MIN_DECIBELS`, `MAX_DECIBELS`] onto
/// 0-255.
pub struct FrequencyAnalyser {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    history: VecDeque<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl FrequencyAnalyser {
    pub fn new(fft_size: usize) -> Result<Self> {
        if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            bail!(
                "fft size {} must be a power of two between {} and {}",
                fft_size,
                MIN_FFT_SIZE,
                MAX_FFT_SIZE
            );
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Ok(Self {
            fft_size,
            fft,
            window: Self::blackman_window(fft_size),
            history: std::iter::repeat(0.0).take(fft_size).collect(),
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        })
    }

    fn blackman_window(size: usize) -> Vec<f32> {
        let alpha = 0.16;
        let a0 = (1.0 - alpha) / 2.0;
        let a1 = 0.5;
        let a2 = alpha / 2.0;
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
            })
            .collect()
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Append mono samples, keeping only the newest `fft_size`.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let keep = samples.len().min(self.fft_size);
        let excess = (self.history.len() + keep).saturating_sub(self.fft_size);
        self.history.drain(..excess);
        self.history.extend(&samples[samples.len() - keep..]);
    }

    /// Fill `out` with the current spectrum, one byte per bin.
    ///
    /// Writes at most [`Self::frequency_bin_count`] bytes; any remainder of
    /// `out` is left untouched.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        for ((slot, &sample), &weight) in self.scratch.iter_mut().zip(&self.history).zip(&self.window) {
            *slot = Complex::new(sample * weight, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let norm = 1.0 / self.fft_size as f32;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.scratch) {
            let magnitude = bin.norm() * norm;
            *smoothed = SMOOTHING_TIME_CONSTANT * *smoothed + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
        }

        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (byte, &magnitude) in out.iter_mut().zip(&self.smoothed) {
            *byte = if magnitude > 0.0 {
                let db = 20.0 * magnitude.log10();
                (255.0 * (db - MIN_DECIBELS) / range).floor().clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency_bin: usize, fft_size: usize, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| {
                let phase = 2.0 * std::f32::consts::PI * frequency_bin as f32 * n as f32 / fft_size as f32;
                amplitude * phase.sin()
            })
            .collect()
    }

    #[test]
    fn test_rejects_invalid_sizes() {
        assert!(FrequencyAnalyser::new(1000).is_err());
        assert!(FrequencyAnalyser::new(16).is_err());
        assert!(FrequencyAnalyser::new(65536).is_err());
        assert!(FrequencyAnalyser::new(FFT_SIZE).is_ok());
    }

    #[test]
    fn test_bin_count_is_half_window() {
        let analyser = FrequencyAnalyser::new(FFT_SIZE).unwrap();
        assert_eq!(analyser.frequency_bin_count(), 1024);
    }

    #[test]
    fn test_silence_reads_as_zero() {
        let mut analyser = FrequencyAnalyser::new(256).unwrap();
        analyser.push_samples(&[0.0; 512]);
        let mut out = vec![7u8; analyser.frequency_bin_count()];
        analyser.byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let mut analyser = FrequencyAnalyser::new(FFT_SIZE).unwrap();
        analyser.push_samples(&sine(64, FFT_SIZE, 0.8, FFT_SIZE));

        let mut out = vec![0u8; analyser.frequency_bin_count()];
        for _ in 0..10 {
            analyser.byte_frequency_data(&mut out);
        }

        let peak = out
            .iter()
            .enumerate()
            .max_by_key(|(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        assert!((63..=65).contains(&peak), "peak at bin {peak}");
        assert_eq!(out[64], 255);
        assert_eq!(out[900], 0);
    }

    #[test]
    fn test_smoothing_decays_after_signal_stops() {
        let mut analyser = FrequencyAnalyser::new(512).unwrap();
        let mut out = vec![0u8; analyser.frequency_bin_count()];

        analyser.push_samples(&sine(32, 512, 0.5, 512));
        for _ in 0..20 {
            analyser.byte_frequency_data(&mut out);
        }
        let loud = out[32];

        analyser.push_samples(&[0.0; 512]);
        analyser.byte_frequency_data(&mut out);
        let first_silent = out[32];
        for _ in 0..200 {
            analyser.byte_frequency_data(&mut out);
        }

        assert!(first_silent > 0, "smoothing should hold energy for a frame");
        assert!(first_silent <= loud);
        assert_eq!(out[32], 0);
    }

    #[test]
    fn test_history_keeps_newest_samples() {
        let mut analyser = FrequencyAnalyser::new(32).unwrap();
        let ramp: Vec<f32> = (0..100).map(|i| i as f32).collect();
        analyser.push_samples(&ramp);
        analyser.push_samples(&[1000.0, 1001.0]);

        assert_eq!(analyser.history.len(), 32);
        assert_eq!(analyser.history.back(), Some(&1001.0));
        assert_eq!(analyser.history.front(), Some(&70.0));
    }

    #[test]
    fn test_short_output_buffer() {
        let mut analyser = FrequencyAnalyser::new(64).unwrap();
        analyser.push_samples(&sine(4, 64, 1.0, 64));
        let mut out = [0u8; 8];
        analyser.byte_frequency_data(&mut out);
        assert!(out[4] > 0);
    }
}
