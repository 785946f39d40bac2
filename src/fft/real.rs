use super::{find_dft, DftPlan};
use num_complex::Complex32;
use num_traits::Zero;
use std::sync::Arc;

/// Real-input FFT of fixed length `n`.
///
/// Output is packed in the usual real-FFT layout: `output[0..=n/2]` holds the
/// real parts of bins `0..=n/2`, and `output[n/2 + i]` holds the imaginary part
/// of bin `i` for `0 < i < n/2`.
pub struct RealFft {
    plan: Arc<dyn DftPlan>,
    scratch: Vec<Complex32>,
}

impl RealFft {
    pub fn new(n: usize) -> Self {
        assert!(n >= 2 && n % 2 == 0, "real FFT length must be even, got {}", n);
        Self {
            plan: find_dft(n),
            scratch: vec![Complex32::zero(); n],
        }
    }

    fn len(&self) -> usize {
        self.plan.size()
    }

    pub fn calculate_fft(&mut self, output: &mut [f32], input: &[f32]) {
        let n = self.len();
        assert_eq!(input.len(), n);
        assert_eq!(output.len(), n);

        for (dst, &x) in self.scratch.iter_mut().zip(input) {
            *dst = Complex32::new(x, 0.0);
        }
        self.plan.xform_inplace(&mut self.scratch);

        let half = n / 2;
        for i in 0..=half {
            output[i] = self.scratch[i].re;
        }
        for i in 1..half {
            output[half + i] = self.scratch[i].im;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn cosine_lands_in_real_half() {
        let n = 64;
        let input: Vec<f32> = (0..n)
            .map(|t| (2.0 * PI * 5.0 * t as f32 / n as f32).cos())
            .collect();
        let mut output = vec![0.0; n];
        RealFft::new(n).calculate_fft(&mut output, &input);

        assert!((output[5] - n as f32 / 2.0).abs() < 1e-3);
        assert!(output[n / 2 + 5].abs() < 1e-3);
        assert!(output[4].abs() < 1e-3);
    }

    #[test]
    fn sine_lands_in_imaginary_half() {
        let n = 64;
        let input: Vec<f32> = (0..n)
            .map(|t| (2.0 * PI * 3.0 * t as f32 / n as f32).sin())
            .collect();
        let mut output = vec![0.0; n];
        RealFft::new(n).calculate_fft(&mut output, &input);

        assert!(output[3].abs() < 1e-3);
        assert!((output[n / 2 + 3].abs() - n as f32 / 2.0).abs() < 1e-3);
    }
}
