pub mod buffer;
pub mod capture;
pub mod format;

pub use buffer::CaptureBuffer;
pub use capture::{start_capture, SampleSource};
pub use format::{pcm_to_real, AudioFormat, SampleFormat};

/// Sample rate requested from the device before clamping to its range.
pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// Channel count requested from the device; the core handles mono or stereo.
pub const TARGET_CHANNELS: u16 = 2;
