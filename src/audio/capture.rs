use super::{AudioFormat, TARGET_CHANNELS, TARGET_SAMPLE_RATE};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat as CpalFormat, SizedSample};
use ringbuf::{Consumer, HeapRb, Producer};
use std::sync::Arc;
use thiserror::Error;

/// Live PCM byte stream feeding the capture buffer.
pub trait SampleSource: Send {
    /// Bytes that can be read right now, always whole frames.
    fn bytes_available(&self) -> usize;

    /// Reads up to `buf.len()` bytes and returns the count read.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Throws away everything queued so far.
    fn discard(&mut self) {
        let mut scratch = [0u8; 4096];
        while self.bytes_available() > 0 {
            let n = self.bytes_available().min(scratch.len());
            if self.read(&mut scratch[..n]) == 0 {
                break;
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no audio input device found, check system settings")]
    NoInputDevice,
    #[error("failed to query input configurations: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),
    #[error("input device offers no PCM format this analyzer can read")]
    NoSupportedFormat,
    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Consumer side of the device queue, holding interleaved little-endian i16 frames.
pub struct LiveSource {
    consumer: Consumer<u8, Arc<HeapRb<u8>>>,
    bytes_per_frame: usize,
}

impl SampleSource for LiveSource {
    fn bytes_available(&self) -> usize {
        let len = self.consumer.len();
        len - len % self.bytes_per_frame
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        self.consumer.pop_slice(buf)
    }
}

/// Starts audio capture on the default input device.
///
/// The returned stream must be kept alive for as long as samples are wanted.
pub fn start_capture(
    queue_duration_us: u64,
) -> Result<(cpal::Stream, LiveSource, AudioFormat), CaptureError> {
    let host = cpal::default_host();

    //
    // Log all available input devices for debugging.
    //
    log::info!("--- AVAILABLE INPUT DEVICES ---");
    if let Ok(devices) = host.input_devices() {
        for (i, dev) in devices.enumerate() {
            let name = dev.name().unwrap_or("Unknown".into());
            log::info!("  [{}]: {}", i, name);
        }
    }
    log::info!("-------------------------------");

    let device = host.default_input_device().ok_or(CaptureError::NoInputDevice)?;
    log::info!(
        "Selected audio device: {}",
        device.name().unwrap_or("Unknown".into())
    );

    let (config, sample_format, device_channels) = select_config(&device)?;
    let format = AudioFormat::int16(config.sample_rate.0, device_channels.min(TARGET_CHANNELS));
    log::info!(
        "Audio config: {:?} @ {}Hz, device channels: {}, kept channels: {}",
        sample_format,
        format.sample_rate,
        device_channels,
        format.channels
    );

    //
    // Queue between the device callback and the engine; sized so the engine
    // can miss several ticks without the device dropping frames.
    //
    let queue_len = format.bytes_for_duration(queue_duration_us).max(format.bytes_per_frame());
    let (producer, consumer) = HeapRb::<u8>::new(queue_len).split();

    let stream = match sample_format {
        CpalFormat::I16 => build_stream::<i16>(&device, &config, producer, format),
        CpalFormat::F32 => build_stream::<f32>(&device, &config, producer, format),
        CpalFormat::U16 => build_stream::<u16>(&device, &config, producer, format),
        _ => return Err(CaptureError::NoSupportedFormat),
    }?;

    stream.play()?;

    let source = LiveSource {
        consumer,
        bytes_per_frame: format.bytes_per_frame(),
    };
    Ok((stream, source, format))
}

/// Picks a stream config, preferring native 16-bit input and stereo, with the
/// sample rate clamped into the device's supported range.
fn select_config(
    device: &cpal::Device,
) -> Result<(cpal::StreamConfig, CpalFormat, u16), CaptureError> {
    let ranges: Vec<_> = device.supported_input_configs()?.collect();

    for wanted in [CpalFormat::I16, CpalFormat::F32, CpalFormat::U16] {
        let best = ranges
            .iter()
            .filter(|r| r.sample_format() == wanted)
            .min_by_key(|r| r.channels().abs_diff(TARGET_CHANNELS));

        if let Some(range) = best {
            let rate =
                TARGET_SAMPLE_RATE.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
            let supported = range.clone().with_sample_rate(cpal::SampleRate(rate));
            let channels = supported.channels();
            return Ok((supported.config(), wanted, channels));
        }
    }

    Err(CaptureError::NoSupportedFormat)
}

/// Builds an input stream that converts device samples to i16 and pushes
/// whole frames of the first `format.channels` channels into the queue.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut producer: Producer<u8, Arc<HeapRb<u8>>>,
    format: AudioFormat,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let device_channels = config.channels as usize;
    let kept = format.channels as usize;
    let bytes_per_frame = format.bytes_per_frame();
    let mut scratch: Vec<u8> = Vec::new();

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            scratch.clear();
            for frame in data.chunks_exact(device_channels) {
                for &sample in &frame[..kept] {
                    scratch.extend_from_slice(&i16::from_sample(sample).to_le_bytes());
                }
            }

            //
            // Only whole frames go in; whatever does not fit is dropped.
            //
            let free = producer.free_len();
            let n = scratch.len().min(free - free % bytes_per_frame);
            producer.push_slice(&scratch[..n]);
        },
        |err| log::error!("Audio input error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// In-memory source used to drive the engine without a device.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySource {
    queue: std::collections::VecDeque<u8>,
}

#[cfg(test)]
impl MemorySource {
    pub fn push(&mut self, bytes: &[u8]) {
        self.queue.extend(bytes.iter().copied());
    }
}

#[cfg(test)]
impl SampleSource for MemorySource {
    fn bytes_available(&self) -> usize {
        self.queue.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.queue.len());
        for (dst, src) in buf.iter_mut().zip(self.queue.drain(..n)) {
            *dst = src;
        }
        n
    }
}
