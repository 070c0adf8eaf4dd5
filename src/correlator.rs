//! Frequency-domain cross-correlation of the two microphone channels.
//!
//! The cross-power spectrum `X1 · conj(X2)` is inverted back to the time
//! domain and rotated by N/2, so zero relative delay sits in the middle of
//! the lag sequence. With this ordering, when channel 2 lags channel 1 by
//! `k` samples the peak lands at `N/2 - k`, and when it leads by `k` the
//! peak lands at `N/2 + k`.
//!
//! The inverse transform is scaled by 1/N (the usual inverse DFT
//! convention) but nothing else is normalized: lag amplitudes depend on the
//! input level and the window energy, so only relative peak heights mean
//! anything.

use crate::spectral::SpectralError;
use num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner};
use std::sync::Arc;

pub struct CrossCorrelator {
    len: usize,
    c2r: Arc<dyn ComplexToReal<f64>>,
}

impl CrossCorrelator {
    /// Plans an inverse transform producing lag sequences of length `len`.
    pub fn new(len: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let c2r = planner.plan_fft_inverse(len);
        Self { len, c2r }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elementwise `spectrum_1 * conj(spectrum_2)`.
    pub fn cross_power(
        spectrum_1: &[Complex<f64>],
        spectrum_2: &[Complex<f64>],
    ) -> Result<Vec<Complex<f64>>, SpectralError> {
        if spectrum_1.len() != spectrum_2.len() {
            return Err(SpectralError::LengthMismatch {
                expected: spectrum_1.len(),
                got: spectrum_2.len(),
            });
        }
        Ok(spectrum_1
            .iter()
            .zip(spectrum_2)
            .map(|(a, b)| a * b.conj())
            .collect())
    }

    /// Produces the centered lag sequence for a pair of channel spectra.
    pub fn correlate(
        &self,
        spectrum_1: &[Complex<f64>],
        spectrum_2: &[Complex<f64>],
    ) -> Result<Vec<f64>, SpectralError> {
        let bins = self.len / 2 + 1;
        if spectrum_1.len() != bins {
            return Err(SpectralError::LengthMismatch {
                expected: bins,
                got: spectrum_1.len(),
            });
        }
        let mut cross = Self::cross_power(spectrum_1, spectrum_2)?;

        // A real signal has purely real DC and Nyquist bins; drop whatever
        // rounding left in there, otherwise realfft rejects the input.
        cross[0].im = 0.0;
        if self.len % 2 == 0 {
            cross[bins - 1].im = 0.0;
        }

        let mut lag = self.c2r.make_output_vec();
        self.c2r.process(&mut cross, &mut lag)?;

        let scale = 1.0 / self.len as f64;
        lag.iter_mut().for_each(|v| *v *= scale);
        lag.rotate_right(self.len / 2);
        Ok(lag)
    }
}

/// Index of the largest absolute value. Used by tests and the summary log
/// line; it is not a sub-sample delay estimator.
pub fn argmax_abs(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::SpectralTransformer;
    use crate::window::{WindowKind, WindowTable};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const N: usize = 128;

    fn noise(seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..N).map(|_| rng.gen_range(-1000.0..1000.0)).collect()
    }

    fn lag_of(kind: WindowKind, s1: &[f64], s2: &[f64]) -> Vec<f64> {
        let mut transformer = SpectralTransformer::new(WindowTable::new(kind, N));
        let correlator = CrossCorrelator::new(N);
        let f1 = transformer.transform(s1).unwrap();
        let f2 = transformer.transform(s2).unwrap();
        correlator.correlate(&f1, &f2).unwrap()
    }

    #[test]
    fn identical_channels_peak_at_center() {
        let s = noise(7);
        for kind in [
            WindowKind::BlackmanHarris,
            WindowKind::Hann,
            WindowKind::Rectangular,
        ] {
            let lag = lag_of(kind, &s, &s);
            assert_eq!(lag.len(), N);
            assert_eq!(argmax_abs(&lag), Some(N / 2), "{kind:?}");
        }
    }

    #[test]
    fn center_value_is_windowed_energy() {
        let s = noise(3);
        let window = WindowTable::new(WindowKind::Hann, N);
        let expected: f64 = s
            .iter()
            .zip(window.coefficients())
            .map(|(x, w)| (x * w).powi(2))
            .sum();
        let lag = lag_of(WindowKind::Hann, &s, &s);
        assert!((lag[N / 2] - expected).abs() < 1e-6 * expected);
    }

    #[test]
    fn circular_shift_moves_the_peak() {
        let s1 = noise(11);
        for k in [1usize, 5, 20] {
            // channel 2 delayed by k: s2[n] = s1[n - k]
            let mut delayed = s1.clone();
            delayed.rotate_right(k);
            let lag = lag_of(WindowKind::Rectangular, &s1, &delayed);
            assert_eq!(argmax_abs(&lag), Some(N / 2 - k));

            // channel 2 ahead by k
            let mut ahead = s1.clone();
            ahead.rotate_left(k);
            let lag = lag_of(WindowKind::Rectangular, &s1, &ahead);
            assert_eq!(argmax_abs(&lag), Some(N / 2 + k));
        }
    }

    #[test]
    fn deterministic() {
        let s1 = noise(1);
        let s2 = noise(2);
        let first = lag_of(WindowKind::BlackmanHarris, &s1, &s2);
        for _ in 0..5 {
            let again = lag_of(WindowKind::BlackmanHarris, &s1, &s2);
            assert!(first
                .iter()
                .zip(&again)
                .all(|(a, b)| a.to_bits() == b.to_bits()));
        }
    }

    #[test]
    fn rejects_wrong_bin_count() {
        let correlator = CrossCorrelator::new(N);
        let short = vec![Complex::new(0.0, 0.0); 10];
        assert!(matches!(
            correlator.correlate(&short, &short),
            Err(SpectralError::LengthMismatch { expected: 65, got: 10 })
        ));
        let good = vec![Complex::new(0.0, 0.0); 65];
        assert!(correlator.correlate(&good, &short).is_err());
    }
}
