use thiserror::Error;

pub const MAX_FRAME_RATE: u32 = 120;
pub const MIN_BAR_COUNT: usize = 2;
pub const MAX_BAR_COUNT: usize = 1024;

/// Lower edge of the first bar (Hz).
pub const DEFAULT_LOW_FREQ: f32 = 20.0;
/// Upper edge of the last bar (Hz).
pub const DEFAULT_HIGH_FREQ: f32 = 20_000.0;
/// Capture window the buffer is sized for (µs).
pub const DEFAULT_CAPTURE_DURATION_US: u64 = 10 * 10_000_000;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("frame rate must be between 1 and 120, got {0}")]
    FrameRate(u32),
    #[error("bar count must be between 2 and 1024, got {0}")]
    BarCount(usize),
    #[error("frequency band must satisfy 0 < low < high, got {low} Hz .. {high} Hz")]
    FrequencyBand { low: f32, high: f32 },
    #[error("capture duration must be positive")]
    CaptureDuration,
}

/// Runtime tunables shared by the engine and the views.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub frame_rate: u32,
    pub bar_count: usize,
    pub low_freq: f32,
    pub high_freq: f32,
    pub capture_duration_us: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_rate: MAX_FRAME_RATE,
            bar_count: 128,
            low_freq: DEFAULT_LOW_FREQ,
            high_freq: DEFAULT_HIGH_FREQ,
            capture_duration_us: DEFAULT_CAPTURE_DURATION_US,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 || self.frame_rate > MAX_FRAME_RATE {
            return Err(ConfigError::FrameRate(self.frame_rate));
        }
        if !(MIN_BAR_COUNT..=MAX_BAR_COUNT).contains(&self.bar_count) {
            return Err(ConfigError::BarCount(self.bar_count));
        }
        if !(self.low_freq > 0.0 && self.high_freq > self.low_freq) {
            return Err(ConfigError::FrequencyBand {
                low: self.low_freq,
                high: self.high_freq,
            });
        }
        if self.capture_duration_us == 0 {
            return Err(ConfigError::CaptureDuration);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.validate(), Ok(()));
        assert_eq!(settings.capture_duration_us, 100_000_000);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let base = Settings::default();

        let s = Settings {
            frame_rate: 0,
            ..base.clone()
        };
        assert_eq!(s.validate(), Err(ConfigError::FrameRate(0)));

        let s = Settings {
            bar_count: 1,
            ..base.clone()
        };
        assert_eq!(s.validate(), Err(ConfigError::BarCount(1)));

        let s = Settings {
            low_freq: 500.0,
            high_freq: 500.0,
            ..base.clone()
        };
        assert!(matches!(s.validate(), Err(ConfigError::FrequencyBand { .. })));

        let s = Settings {
            capture_duration_us: 0,
            ..base
        };
        assert_eq!(s.validate(), Err(ConfigError::CaptureDuration));
    }
}
