//! Spectral analysis of airflow windows
//!
//! One-sided power spectra of Hann-windowed flow segments. Band energies
//! over the breathing-relevant ranges feed the airway event classifier.

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// One-sided power spectrum of a real signal.
#[derive(Debug, Clone)]
pub struct PowerSpectrum {
    /// Magnitude-squared DFT values, bins 0..=N/2
    pub psd: Vec<f64>,
    /// Frequency resolution (Hz per bin)
    pub freq_resolution: f64,
}

impl PowerSpectrum {
    /// Compute the one-sided power spectrum of a Hann-windowed signal.
    ///
    /// `psd[k] = |DFT(hann * signal)[k]|^2` for `k in 0..=N/2`, with bin
    /// center frequencies `k * sample_rate / N`.
    pub fn compute(signal: &[f64], sample_rate_hz: u32) -> Self {
        let n = signal.len();
        let window = hann_window(n);

        let mut buffer: Vec<Complex64> = signal
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| Complex64::new(s * w, 0.0))
            .collect();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        let n_freq = n / 2 + 1;
        let psd = buffer[..n_freq]
            .iter()
            .map(|c| {
                let mag = c.norm();
                mag * mag
            })
            .collect();

        Self {
            psd,
            freq_resolution: sample_rate_hz as f64 / n as f64,
        }
    }

    /// Mean spectral power over bins whose center frequency falls in
    /// `[low_hz, high_hz)`. Returns 0 if no bins fall in the band.
    pub fn band_energy(&self, low_hz: f64, high_hz: f64) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for (k, &power) in self.psd.iter().enumerate() {
            let freq = k as f64 * self.freq_resolution;
            if freq >= low_hz && freq < high_hz {
                sum += power;
                count += 1;
            }
        }
        if count == 0 {
            return 0.0;
        }
        sum / count as f64
    }
}

/// Hann (raised-cosine) window of the given size.
pub fn hann_window(size: usize) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_symmetric() {
        let w = hann_window(64);
        for i in 0..32 {
            assert!((w[i] - w[63 - i]).abs() < 1e-10, "not symmetric at {i}");
        }
        assert!(w[0].abs() < 1e-12);
        assert!(w[63].abs() < 1e-12);
    }

    #[test]
    fn test_hann_window_degenerate_sizes() {
        assert!(hann_window(0).is_empty());
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn test_sine_peak_lands_in_correct_bin() {
        // 1 Hz tone at 25 Hz sampling, 10 s window -> bin 10
        let sample_rate = 25u32;
        let signal: Vec<f64> = (0..250)
            .map(|i| (2.0 * PI * 1.0 * i as f64 / sample_rate as f64).sin())
            .collect();

        let spectrum = PowerSpectrum::compute(&signal, sample_rate);
        assert_eq!(spectrum.psd.len(), 126); // 250/2 + 1
        assert!((spectrum.freq_resolution - 0.1).abs() < 1e-12);

        let peak_bin = spectrum
            .psd
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(k, _)| k)
            .unwrap();
        assert_eq!(peak_bin, 10);
    }

    #[test]
    fn test_band_energy_concentrated_in_tone_band() {
        let sample_rate = 25u32;
        let signal: Vec<f64> = (0..250)
            .map(|i| (2.0 * PI * 1.0 * i as f64 / sample_rate as f64).sin())
            .collect();

        let spectrum = PowerSpectrum::compute(&signal, sample_rate);
        let low = spectrum.band_energy(0.0, 0.5);
        let mid = spectrum.band_energy(0.5, 2.0);
        assert!(mid > 1.0, "mid band should hold the tone energy: {mid}");
        assert!(low < mid * 1e-3, "low band should be near-empty: {low}");
    }

    #[test]
    fn test_band_energy_empty_band_is_zero() {
        let signal = vec![1.0; 8];
        let spectrum = PowerSpectrum::compute(&signal, 2);
        // Nyquist is 1 Hz; nothing lives above it
        assert_eq!(spectrum.band_energy(5.0, 10.0), 0.0);
    }

    #[test]
    fn test_zero_signal_has_zero_spectrum() {
        let spectrum = PowerSpectrum::compute(&vec![0.0; 100], 25);
        assert!(spectrum.psd.iter().all(|&p| p == 0.0));
    }
}
