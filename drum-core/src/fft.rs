//! # Fast Fourier Transform (FFT) Module
//!
//! In-place iterative radix-2 Cooley–Tukey transform over split real/imaginary
//! arrays. Twiddle tables are computed once at construction, so repeated
//! transforms on the audio path perform no allocation.
//!
//! ## Features
//! - Bit-reversal permutation followed by log2(N) butterfly stages
//! - Forward convention `X[k] = Σ x[n]·e^(-2πikn/N)`
//! - Inverse via conjugation and 1/N scaling

use std::f64::consts::PI;

use crate::error::{require_power_of_two, ConfigError};

/// Radix-2 FFT of a fixed power-of-two size.
#[derive(Debug, Clone)]
pub struct Radix2Fft {
    size: usize,
    levels: u32,
    cos_table: Vec<f64>,
    /// Stored negated, matching the forward transform's sign.
    sin_table: Vec<f64>,
}

impl Radix2Fft {
    /// Precomputes the twiddle tables for an `size`-point transform.
    ///
    /// # Returns
    /// * `Err(ConfigError)` - if `size` is zero or not a power of two
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        require_power_of_two("fftSize", size)?;
        let half = size / 2;
        let mut cos_table = Vec::with_capacity(half);
        let mut sin_table = Vec::with_capacity(half);
        for k in 0..half {
            let angle = 2.0 * PI * k as f64 / size as f64;
            cos_table.push(angle.cos());
            sin_table.push(-angle.sin());
        }
        Ok(Self {
            size,
            levels: size.trailing_zeros(),
            cos_table,
            sin_table,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform, overwriting `real` and `imag` with the spectrum.
    ///
    /// # Panics
    /// * If either slice length differs from the planned size
    pub fn transform(&self, real: &mut [f64], imag: &mut [f64]) {
        let n = self.size;
        assert_eq!(real.len(), n, "real buffer length must equal the FFT size");
        assert_eq!(imag.len(), n, "imag buffer length must equal the FFT size");

        for i in 0..n {
            let j = reverse_bits(i, self.levels);
            if j > i {
                real.swap(i, j);
                imag.swap(i, j);
            }
        }

        let mut span = 2;
        while span <= n {
            let half = span / 2;
            let table_step = n / span;
            for start in (0..n).step_by(span) {
                for (k, j) in (start..start + half).enumerate() {
                    let l = j + half;
                    let cos = self.cos_table[k * table_step];
                    let sin = self.sin_table[k * table_step];
                    let tpre = real[l] * cos - imag[l] * sin;
                    let tpim = real[l] * sin + imag[l] * cos;
                    real[l] = real[j] - tpre;
                    imag[l] = imag[j] - tpim;
                    real[j] += tpre;
                    imag[j] += tpim;
                }
            }
            span <<= 1;
        }
    }

    /// Inverse transform: conjugate, forward transform, conjugate, scale by 1/N.
    pub fn inverse(&self, real: &mut [f64], imag: &mut [f64]) {
        imag.iter_mut().for_each(|v| *v = -*v);
        self.transform(real, imag);
        let scale = 1.0 / self.size as f64;
        real.iter_mut().for_each(|v| *v *= scale);
        imag.iter_mut().for_each(|v| *v = -*v * scale);
    }
}

fn reverse_bits(index: usize, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    index.reverse_bits() >> (usize::BITS - bits)
}
