use super::DftPlan;
use num_complex::Complex32;
use std::f32::consts::PI;

/// Twiddle factor e^(-2πi·k/n).
fn w(k: usize, n: usize) -> Complex32 {
    let angle = -2.0 * PI * (k as f32) / (n as f32);
    Complex32::from_polar(1.0, angle)
}

/// Reverses the lowest `bits` bits of `i`.
fn reverse_bits(i: usize, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    i.reverse_bits() >> (usize::BITS - bits)
}

//
// Iterative radix-2 (Cooley–Tukey) implementation.
//
pub struct DftRadix2 {
    n: usize,
    wtable: Vec<Complex32>,
    bitrev: Vec<usize>,
}

impl DftRadix2 {
    pub fn new(n: usize) -> Self {
        assert!(
            n.is_power_of_two(),
            "radix-2 plan needs a power-of-two length, got {}",
            n
        );
        let bits = n.trailing_zeros();

        //
        // Precompute the twiddles for the widest butterfly stage; narrower
        // stages index into the same table with a stride.
        //
        let wtable = (0..n / 2).map(|k| w(k, n)).collect();

        //
        // Input permutation applied before the butterflies.
        //
        let bitrev = (0..n).map(|i| reverse_bits(i, bits)).collect();

        Self { n, wtable, bitrev }
    }
}

impl DftPlan for DftRadix2 {
    fn name(&self) -> String {
        format!("Radix2({})", self.n)
    }

    fn size(&self) -> usize {
        self.n
    }

    fn xform_inplace(&self, buffer: &mut [Complex32]) {
        assert_eq!(buffer.len(), self.n, "buffer length does not match plan size");
        let n = self.n;

        for i in 0..n {
            let j = self.bitrev[i];
            if i < j {
                buffer.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let stride = n / len;
            for start in (0..n).step_by(len) {
                for k in 0..half {
                    let t = buffer[start + k + half] * self.wtable[k * stride];
                    let u = buffer[start + k];
                    buffer[start + k] = u + t;
                    buffer[start + k + half] = u - t;
                }
            }
            len <<= 1;
        }
    }
}
