//! Windowing plus a real-input forward FFT, applied identically to both
//! channels.

use crate::window::WindowTable;
use num_complex::Complex;
use realfft::{FftError, RealFftPlanner, RealToComplex};
use std::{fmt, sync::Arc};

/// Errors from the spectral stages.
#[derive(Debug)]
pub enum SpectralError {
    /// A sequence reached a transform whose length it does not match.
    LengthMismatch { expected: usize, got: usize },
    /// realfft refused the buffers it was given.
    Fft(FftError),
}

impl fmt::Display for SpectralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectralError::LengthMismatch { expected, got } => {
                write!(f, "length mismatch: expected {expected}, got {got}")
            }
            SpectralError::Fft(error) => write!(f, "fft error: {error}"),
        }
    }
}

impl std::error::Error for SpectralError {}

impl From<FftError> for SpectralError {
    fn from(value: FftError) -> Self {
        Self::Fft(value)
    }
}

/// Holds a planned forward transform and the shared window table.
pub struct SpectralTransformer {
    window: WindowTable,
    r2c: Arc<dyn RealToComplex<f64>>,
    scratch: Vec<f64>,
}

impl SpectralTransformer {
    /// Plans a forward transform the same length as `window`.
    pub fn new(window: WindowTable) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(window.len());
        let scratch = r2c.make_input_vec();

        Self {
            window,
            r2c,
            scratch,
        }
    }

    /// Transform length N.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Number of output bins, N/2 + 1.
    pub fn num_bins(&self) -> usize {
        self.window.len() / 2 + 1
    }

    pub fn window(&self) -> &WindowTable {
        &self.window
    }

    /// Multiplies `signal` by the window and returns its non-negative
    /// frequency spectrum.
    pub fn transform(&mut self, signal: &[f64]) -> Result<Vec<Complex<f64>>, SpectralError> {
        if signal.len() != self.window.len() {
            return Err(SpectralError::LengthMismatch {
                expected: self.window.len(),
                got: signal.len(),
            });
        }

        for ((dst, &s), &w) in self
            .scratch
            .iter_mut()
            .zip(signal)
            .zip(self.window.coefficients())
        {
            *dst = s * w;
        }

        let mut spectrum = self.r2c.make_output_vec();
        self.r2c.process(&mut self.scratch, &mut spectrum)?;
        Ok(spectrum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowKind;
    use std::f64::consts::PI;

    #[test]
    fn output_has_half_plus_one_bins() {
        let mut transformer = SpectralTransformer::new(WindowTable::new(WindowKind::Hann, 128));
        let spectrum = transformer.transform(&[0.0; 128]).unwrap();
        assert_eq!(spectrum.len(), 65);
        assert_eq!(transformer.num_bins(), 65);
        assert!(spectrum.iter().all(|c| c.norm() == 0.0));
    }

    #[test]
    fn sine_lands_in_its_bin() {
        let mut transformer =
            SpectralTransformer::new(WindowTable::new(WindowKind::BlackmanHarris, 128));
        let signal: Vec<f64> = (0..128)
            .map(|n| (2.0 * PI * 10.0 * n as f64 / 128.0).sin())
            .collect();
        let spectrum = transformer.transform(&signal).unwrap();

        let (peak_bin, _) = spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.norm().partial_cmp(&b.norm()).unwrap())
            .unwrap();
        assert_eq!(peak_bin, 10);
    }

    #[test]
    fn length_mismatch_fails() {
        let mut transformer =
            SpectralTransformer::new(WindowTable::new(WindowKind::Rectangular, 128));
        match transformer.transform(&[1.0; 127]) {
            Err(SpectralError::LengthMismatch { expected, got }) => {
                assert_eq!(expected, 128);
                assert_eq!(got, 127);
            }
            other => panic!("expected a length mismatch, got {other:?}"),
        }
    }
}
