/// Largest magnitude of a signed 16-bit sample; the minimum is -32768.
const PCM_S16_MAX_AMPLITUDE: f32 = 32768.0;

/// Scales a signed 16-bit PCM sample to the range [-1.0, 1.0].
#[inline]
pub fn pcm_to_real(pcm: i16) -> f32 {
    pcm as f32 / PCM_S16_MAX_AMPLITUDE
}

/// Sample encodings the core accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    Int16,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Int16 => 2,
        }
    }
}

/// Interleaved PCM stream description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

impl AudioFormat {
    pub fn int16(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format: SampleFormat::Int16,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0 && self.channels > 0
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.sample_format.bytes_per_sample() * self.channels as usize
    }

    /// Whole frames covered by `duration_us` microseconds.
    pub fn frames_for_duration(&self, duration_us: u64) -> u64 {
        self.sample_rate as u64 * duration_us / 1_000_000
    }

    /// Bytes needed to hold `duration_us` microseconds, rounded down to whole frames.
    pub fn bytes_for_duration(&self, duration_us: u64) -> usize {
        self.frames_for_duration(duration_us) as usize * self.bytes_per_frame()
    }
}
