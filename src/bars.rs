//! Frequency spectrum to display bars.
//!
//! One algorithm, two parameter sets: planar bars for the 2D view and halo
//! bands that scale the radius of the 3D ring.

use crate::spectrum::FrequencySpectrum;

/// Upper edge of the log binning range for planar bars.
pub const PLANAR_BIN_UPPER_BOUND: f32 = 20_000.0;
/// Upper edge of the log binning range for halo bands. Differs from the planar
/// value on purpose; both are calibration constants.
pub const HALO_BIN_UPPER_BOUND: f32 = 19_000.0;

/// Angular sectors in the halo ring.
pub const HALO_BANDS: usize = 20;

/// Base of the logarithm used for bar placement.
const LOG_BASE: f32 = 100.0;

/// Bar value range used for the bass level.
const BASS_FLOOR: f32 = 0.05;
const BASS_CEIL: f32 = 0.7;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bar {
    pub value: f32,
    pub clipped: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarMapperParams {
    pub bar_count: usize,
    pub low_freq: f32,
    pub high_freq: f32,
    pub bin_upper_bound: f32,
    /// Value every bar is reset to before binning.
    pub baseline: f32,
    /// Bar value for a spectrum element is `baseline + amplitude * gain`.
    pub gain: f32,
    pub fill_gaps: bool,
    /// Left, centre and right weights of the triangular smoothing kernel.
    pub smoothing_weights: [f32; 3],
    /// Smoothing is skipped below this many bars.
    pub min_bars_for_smoothing: usize,
    /// Share of the previous frame kept in the current one.
    pub decay: f32,
}

impl BarMapperParams {
    pub fn planar(bar_count: usize, low_freq: f32, high_freq: f32) -> Self {
        Self {
            bar_count,
            low_freq,
            high_freq,
            bin_upper_bound: PLANAR_BIN_UPPER_BOUND,
            baseline: 0.0,
            gain: 1.0,
            fill_gaps: true,
            smoothing_weights: [1.0 / 3.0; 3],
            min_bars_for_smoothing: 64,
            decay: 0.9,
        }
    }

    pub fn halo(low_freq: f32, high_freq: f32) -> Self {
        Self {
            bar_count: HALO_BANDS,
            low_freq,
            high_freq,
            bin_upper_bound: HALO_BIN_UPPER_BOUND,
            baseline: 1.0,
            gain: 0.3,
            fill_gaps: false,
            smoothing_weights: [0.2, 0.6, 0.2],
            min_bars_for_smoothing: 0,
            decay: 0.6,
        }
    }

    fn check(&self) {
        assert!(self.bar_count >= 2, "bar count must be at least 2");
        assert!(self.low_freq > 0.0, "low frequency must be positive");
        assert!(
            self.high_freq > self.low_freq,
            "high frequency {} must exceed low frequency {}",
            self.high_freq,
            self.low_freq
        );
    }
}

fn log_a(x: f32, base: f32) -> f32 {
    x.log2() / base.log2()
}

/// Turns spectra into a fixed number of smoothed, decaying bars.
pub struct BarMapper {
    params: BarMapperParams,
    bars: Vec<Bar>,
    prev_bars: Vec<Bar>,
}

impl BarMapper {
    pub fn new(params: BarMapperParams) -> Self {
        params.check();
        let baseline = Bar {
            value: params.baseline,
            clipped: false,
        };
        Self {
            params,
            bars: vec![baseline; params.bar_count],
            prev_bars: vec![baseline; params.bar_count],
        }
    }

    /// Changes bar count and band, dropping the current bar state.
    pub fn set_params(&mut self, bar_count: usize, low_freq: f32, high_freq: f32) {
        let params = BarMapperParams {
            bar_count,
            low_freq,
            high_freq,
            ..self.params
        };
        *self = Self::new(params);
    }

    /// Restores every bar, current and previous, to the baseline.
    pub fn reset(&mut self) {
        let baseline = Bar {
            value: self.params.baseline,
            clipped: false,
        };
        self.bars.fill(baseline);
        self.prev_bars.fill(baseline);
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn values(&self) -> Vec<f32> {
        self.bars.iter().map(|b| b.value).collect()
    }

    pub fn update(&mut self, spectrum: &FrequencySpectrum) {
        let p = self.params;

        self.prev_bars.copy_from_slice(&self.bars);
        self.bars.fill(Bar {
            value: p.baseline,
            clipped: false,
        });

        //
        // Log binning. The lower edge is the first in-band frequency seen.
        //
        let mut lower = 0.0;
        for e in spectrum {
            if e.frequency < p.low_freq || e.frequency >= p.high_freq {
                continue;
            }
            if lower == 0.0 {
                lower = e.frequency;
            }
            let index = self.bar_index(e.frequency, lower);
            let bar = &mut self.bars[index];
            bar.value = bar.value.max(p.baseline + e.amplitude * p.gain);
            bar.clipped |= e.clipped;
        }

        if p.fill_gaps {
            fill_gaps(&mut self.bars);
        }
        if self.bars.len() >= p.min_bars_for_smoothing {
            smooth(&mut self.bars, p.smoothing_weights);
        }

        // Decay goes last, after spatial smoothing.
        for (bar, prev) in self.bars.iter_mut().zip(&self.prev_bars) {
            bar.value += (prev.value - bar.value) * p.decay;
        }
    }

    fn bar_index(&self, frequency: f32, lower: f32) -> usize {
        let count = self.bars.len();
        let position = (log_a(frequency, LOG_BASE) - log_a(lower, LOG_BASE))
            / (log_a(self.params.bin_upper_bound, LOG_BASE) - log_a(lower, LOG_BASE))
            * count as f32;
        // Float-to-int casts saturate, so negative or NaN positions land on 0.
        (position.floor() as usize).min(count - 1)
    }
}

/// Bass level in [0, 1]-ish from the lowest quarter of the bars.
pub fn bass_level(bars: &[Bar]) -> f32 {
    let quarter = bars.len() / 4;
    bars[..quarter]
        .iter()
        .find(|b| b.value >= BASS_FLOOR)
        .map(|b| (b.value - BASS_FLOOR) / (BASS_CEIL - BASS_FLOOR))
        .unwrap_or(0.0)
}

/// Linearly interpolates short runs of empty bars that start in the lowest
/// quarter, where log spacing leaves bars without any FFT bin.
fn fill_gaps(bars: &mut [Bar]) {
    let n = bars.len();
    let max_run = (n / 10).max(2);
    let scan_end = (n / 4).max(1);

    let mut i = 0;
    while i < scan_end {
        if bars[i].value == 0.0 || i + 1 >= n || bars[i + 1].value != 0.0 {
            i += 1;
            continue;
        }

        let since = i + 1;
        let mut to = since;
        while to < n && bars[to].value == 0.0 && to - since < max_run {
            to += 1;
        }

        //
        // Zeros in [since, to); only a run closed by a non-zero bar is filled.
        //
        if to < n && bars[to].value != 0.0 {
            let left = bars[i].value;
            let right = bars[to].value;
            let span = (to - i) as f32;
            for j in since..to {
                let t = (j - i) as f32 / span;
                bars[j].value = left + (right - left) * t;
            }
        }
        i = to;
    }
}

/// Triangular smoothing: a left-to-right pass then a right-to-left pass.
fn smooth(bars: &mut [Bar], [wl, wc, wr]: [f32; 3]) {
    let n = bars.len();
    if n < 3 {
        return;
    }
    for i in 1..n - 1 {
        bars[i].value = bars[i - 1].value * wl + bars[i].value * wc + bars[i + 1].value * wr;
    }
    for i in (1..n - 1).rev() {
        bars[i].value = bars[i - 1].value * wl + bars[i].value * wc + bars[i + 1].value * wr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::Element;

    fn spectrum_of(points: &[(f32, f32)]) -> FrequencySpectrum {
        let mut spectrum = FrequencySpectrum::new(points.len());
        for (i, &(frequency, amplitude)) in points.iter().enumerate() {
            spectrum[i] = Element {
                frequency,
                amplitude,
                ..Element::default()
            };
        }
        spectrum
    }

    fn bars_of(values: &[f32]) -> Vec<Bar> {
        values
            .iter()
            .map(|&value| Bar {
                value,
                clipped: false,
            })
            .collect()
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn gap_fill_interpolates_between_neighbours() {
        let mut bars = bars_of(&[0.8, 0.0, 0.0, 0.4]);
        fill_gaps(&mut bars);

        assert!(close(bars[1].value, 0.8 - 0.4 / 3.0));
        assert!(close(bars[2].value, 0.8 - 0.8 / 3.0));
        assert_eq!(bars[3].value, 0.4);
    }

    #[test]
    fn gap_fill_leaves_long_runs_empty() {
        // 40 bars: runs of up to 4 are filled, 5 is too long.
        let mut values = vec![0.0; 40];
        values[0] = 0.5;
        values[5] = 0.5;
        values[6] = 0.2;
        values[11] = 0.7;
        let mut bars = bars_of(&values);
        fill_gaps(&mut bars);

        assert!(bars[1..5].iter().all(|b| close(b.value, 0.5)));
        assert!(bars[7..11].iter().all(|b| b.value > 0.2 && b.value < 0.7));

        let mut values = vec![0.0; 40];
        values[0] = 0.5;
        values[6] = 0.5;
        let mut bars = bars_of(&values);
        fill_gaps(&mut bars);
        assert!(bars[1..6].iter().all(|b| b.value == 0.0));
    }

    #[test]
    fn update_places_bins_and_interpolates() {
        let mut mapper = BarMapper::new(BarMapperParams::planar(4, 20.0, 20_000.0));
        // 100 Hz sets the lower edge (bar 0); 8 kHz lands in bar 3.
        mapper.update(&spectrum_of(&[(10.0, 0.9), (100.0, 0.8), (8_000.0, 0.4)]));

        // Previous frame was silent, so decay keeps a tenth of the new frame.
        let v = mapper.values();
        assert!(close(v[0], 0.08));
        assert!(close(v[3], 0.04));
        assert!(close(v[1] - v[0], v[2] - v[1]));
        assert!(close(v[2] - v[1], v[3] - v[2]));
    }

    #[test]
    fn halo_gain_smoothing_and_decay() {
        let mut mapper = BarMapper::new(BarMapperParams::halo(20.0, 20_000.0));

        // One full-scale bin in band 0: 1.0 + 1.0 * 0.3 before smoothing.
        mapper.update(&spectrum_of(&[(100.0, 1.0)]));
        let v = mapper.values();
        assert!(close(v[0], 1.12));
        assert!(close(v[1], 1.04));
        assert!(close(v[2], 1.008));
        assert!(close(v[3], 1.0016));
        assert!(close(v[HALO_BANDS - 1], 1.0));

        // Silence keeps 60% of the excess over the baseline.
        mapper.update(&FrequencySpectrum::default());
        let v = mapper.values();
        assert!(close(v[0], 1.072));
        assert!(close(v[1], 1.024));
        assert!(close(v[2], 1.0048));
    }

    #[test]
    fn gap_fill_ignores_runs_above_lowest_quarter() {
        // 40 bars: only runs starting below bar 10 are considered.
        let mut values = vec![0.0; 40];
        values[12] = 0.5;
        values[15] = 0.5;
        let mut bars = bars_of(&values);
        fill_gaps(&mut bars);
        assert!(bars[13..15].iter().all(|b| b.value == 0.0));

        // The same run inside the quarter is filled.
        let mut values = vec![0.0; 40];
        values[2] = 0.5;
        values[5] = 0.5;
        let mut bars = bars_of(&values);
        fill_gaps(&mut bars);
        assert!(bars[3..5].iter().all(|b| close(b.value, 0.5)));
    }

    #[test]
    fn out_of_band_elements_are_ignored() {
        let mut mapper = BarMapper::new(BarMapperParams::planar(128, 20.0, 20_000.0));
        mapper.update(&spectrum_of(&[(10.0, 1.0), (20_000.0, 1.0), (23_000.0, 1.0)]));
        assert!(mapper.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn halo_index_is_clamped_past_its_upper_bound() {
        let mut mapper = BarMapper::new(BarMapperParams::halo(20.0, 20_000.0));
        mapper.update(&spectrum_of(&[(100.0, 0.0), (19_500.0, 1.0)]));

        let v = mapper.values();
        assert_eq!(v.len(), HALO_BANDS);
        assert!(v[HALO_BANDS - 1] > 1.0);
        assert!(v.iter().all(|&x| x >= 1.0 - 1e-6));
    }

    #[test]
    fn clipping_is_or_ed_per_bar() {
        let mut spectrum = spectrum_of(&[(100.0, 0.2), (101.0, 1.0)]);
        spectrum[1].clipped = true;
        let mut mapper = BarMapper::new(BarMapperParams::planar(8, 20.0, 20_000.0));
        mapper.update(&spectrum);
        assert!(mapper.bars()[0].clipped);
        assert!(!mapper.bars()[1].clipped);
    }

    #[test]
    fn smoothing_depends_on_bar_count() {
        let spectrum = spectrum_of(&[(100.0, 0.0), (1_000.0, 1.0)]);

        let mut coarse = BarMapper::new(BarMapperParams::planar(32, 20.0, 20_000.0));
        coarse.update(&spectrum);
        let lit = coarse.values().iter().filter(|&&v| v > 0.0).count();
        assert_eq!(lit, 1);

        let mut fine = BarMapper::new(BarMapperParams::planar(128, 20.0, 20_000.0));
        fine.update(&spectrum);
        let lit = fine.values().iter().filter(|&&v| v > 0.0).count();
        assert!(lit > 1);
    }

    #[test]
    fn silence_decays_towards_baseline() {
        let loud = spectrum_of(&[(100.0, 1.0), (500.0, 0.9), (5_000.0, 0.7), (15_000.0, 0.5)]);
        let silent = FrequencySpectrum::new(4);

        for params in [
            BarMapperParams::planar(128, 20.0, 20_000.0),
            BarMapperParams::halo(20.0, 20_000.0),
        ] {
            let mut mapper = BarMapper::new(params);
            for _ in 0..5 {
                mapper.update(&loud);
            }
            let mut prev = mapper.values();
            for _ in 0..200 {
                mapper.update(&silent);
                let now = mapper.values();
                for (a, b) in now.iter().zip(&prev) {
                    assert!((a - params.baseline).abs() <= (b - params.baseline).abs() + 1e-6);
                }
                prev = now;
            }
            assert!(prev.iter().all(|v| (v - params.baseline).abs() < 1e-3));
        }
    }

    #[test]
    fn reset_restores_baseline() {
        let loud = spectrum_of(&[(100.0, 1.0), (2_000.0, 1.0)]);

        let mut planar = BarMapper::new(BarMapperParams::planar(64, 20.0, 20_000.0));
        planar.update(&loud);
        planar.reset();
        assert!(planar.bars().iter().all(|b| *b == Bar::default()));
        planar.update(&FrequencySpectrum::default());
        assert!(planar.values().iter().all(|&v| v == 0.0));

        let mut halo = BarMapper::new(BarMapperParams::halo(20.0, 20_000.0));
        halo.update(&loud);
        halo.reset();
        assert!(halo.values().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn set_params_resizes() {
        let mut mapper = BarMapper::new(BarMapperParams::planar(128, 20.0, 20_000.0));
        mapper.set_params(256, 30.0, 18_000.0);
        assert_eq!(mapper.bars().len(), 256);
        assert_eq!(mapper.params.low_freq, 30.0);
        assert_eq!(mapper.params.decay, 0.9);
    }

    #[test]
    fn bass_reads_lowest_quarter() {
        let mut mapper = BarMapper::new(BarMapperParams::planar(8, 20.0, 20_000.0));
        assert_eq!(bass_level(mapper.bars()), 0.0);
        mapper.bars[1].value = 0.7;
        assert!(close(bass_level(mapper.bars()), 1.0));
        mapper.bars[1].value = 0.0;
        mapper.bars[4].value = 0.7;
        assert_eq!(bass_level(mapper.bars()), 0.0);
    }

    #[test]
    #[should_panic]
    fn inverted_band_is_rejected() {
        BarMapper::new(BarMapperParams::planar(128, 20_000.0, 20.0));
    }

    #[test]
    #[should_panic]
    fn single_bar_is_rejected() {
        BarMapper::new(BarMapperParams::planar(1, 20.0, 20_000.0));
    }
}
