pub mod analyser;

pub use analyser::SpectrumAnalyser;

use std::ops::{Index, IndexMut};

/// Samples per analysis window (2^10). Must be even for the real FFT.
pub const FFT_LENGTH_POWER_OF_TWO: u32 = 10;
pub const SPECTRUM_LENGTH_SAMPLES: usize = 1 << FFT_LENGTH_POWER_OF_TWO;

/// One frequency-domain sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Element {
    /// Hz.
    pub frequency: f32,
    /// In [0.0, 1.0].
    pub amplitude: f32,
    /// In [0.0, 2π).
    pub phase: f32,
    /// Amplitude exceeded 1.0 before clamping.
    pub clipped: bool,
}

/// Ordered sequence of spectrum elements, lowest frequency first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrequencySpectrum {
    elements: Vec<Element>,
}

impl FrequencySpectrum {
    pub fn new(num_points: usize) -> Self {
        Self {
            elements: vec![Element::default(); num_points],
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    /// Element with the largest amplitude, if any.
    pub fn peak(&self) -> Option<&Element> {
        self.elements
            .iter()
            .max_by(|a, b| a.amplitude.total_cmp(&b.amplitude))
    }
}

impl Index<usize> for FrequencySpectrum {
    type Output = Element;

    fn index(&self, index: usize) -> &Element {
        &self.elements[index]
    }
}

impl IndexMut<usize> for FrequencySpectrum {
    fn index_mut(&mut self, index: usize) -> &mut Element {
        &mut self.elements[index]
    }
}

impl<'a> IntoIterator for &'a FrequencySpectrum {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_spectrum_is_all_zero() {
        let spectrum = FrequencySpectrum::new(4);
        assert_eq!(spectrum.len(), 4);
        assert!(spectrum.iter().all(|e| *e == Element::default()));
    }

    #[test]
    fn peak_picks_loudest_element() {
        let mut spectrum = FrequencySpectrum::new(3);
        spectrum[0].amplitude = 0.1;
        spectrum[1].amplitude = 0.7;
        spectrum[2].amplitude = 0.3;
        assert_eq!(spectrum.peak().map(|e| e.amplitude), Some(0.7));
        assert!(FrequencySpectrum::default().peak().is_none());
    }
}
