use super::{Element, FrequencySpectrum, SPECTRUM_LENGTH_SAMPLES};
use crate::audio::{pcm_to_real, AudioFormat, SampleFormat};
use crate::fft::RealFft;
use std::f32::consts::PI;
use std::sync::mpsc;
use std::thread;

/// Gain applied to the natural log of each bin magnitude.
pub const SPECTRUM_ANALYSER_MULTIPLIER: f32 = 0.15;

/// Magnitudes below this count as silence instead of going through `ln`.
const MAGNITUDE_EPSILON: f32 = f32::EPSILON;

/// Maps a bin magnitude to a clamped display amplitude and its clip flag.
pub fn amplitude_from_magnitude(magnitude: f32) -> (f32, bool) {
    if !(magnitude >= MAGNITUDE_EPSILON) {
        return (0.0, false);
    }
    let amplitude = SPECTRUM_ANALYSER_MULTIPLIER * magnitude.ln();
    (amplitude.clamp(0.0, 1.0), amplitude > 1.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Busy,
    Cancelled,
}

/// PCM slice handed to the worker; owned, never aliased with the capture buffer.
struct CalculationJob {
    buffer: Vec<u8>,
    sample_rate: u32,
    bytes_per_frame: usize,
}

enum WorkerMessage {
    Calculate(CalculationJob),
    SetWindowFunction,
}

/// FFT stage. Owns the window, scratch buffers and transform.
pub struct AnalyserWorker {
    fft: RealFft,
    num_samples: usize,
    window: Vec<f32>,
    input: Vec<f32>,
    output: Vec<f32>,
}

impl AnalyserWorker {
    pub fn new(num_samples: usize) -> Self {
        let mut worker = Self {
            fft: RealFft::new(num_samples),
            num_samples,
            window: vec![0.0; num_samples],
            input: vec![0.0; num_samples],
            output: vec![0.0; num_samples],
        };
        worker.calculate_window();
        worker
    }

    /// Hann window.
    fn calculate_window(&mut self) {
        let denom = (self.num_samples - 1) as f32;
        for (i, w) in self.window.iter_mut().enumerate() {
            *w = 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos());
        }
    }

    /// Windows and transforms `num_samples` frames of 16-bit PCM. Only the first
    /// sample of each frame is used.
    pub fn calculate_spectrum(
        &mut self,
        buffer: &[u8],
        sample_rate: u32,
        bytes_per_frame: usize,
    ) -> FrequencySpectrum {
        let n = self.num_samples;
        assert_eq!(buffer.len(), n * bytes_per_frame);

        for (i, frame) in buffer.chunks_exact(bytes_per_frame).enumerate() {
            let pcm = i16::from_le_bytes([frame[0], frame[1]]);
            self.input[i] = pcm_to_real(pcm) * self.window[i];
        }

        self.fft.calculate_fft(&mut self.output, &self.input);

        //
        // Bins 0 and 1 stay at their zero defaults.
        //
        let half = n / 2;
        let mut spectrum = FrequencySpectrum::new(half + 1);
        for i in 2..=half {
            let real = self.output[i];
            let imag = if i < half { self.output[half + i] } else { 0.0 };
            let magnitude = (real * real + imag * imag).sqrt();
            let (amplitude, clipped) = amplitude_from_magnitude(magnitude);

            spectrum[i] = Element {
                frequency: (i as u64 * sample_rate as u64) as f32 / n as f32,
                amplitude,
                phase: imag.atan2(real).rem_euclid(2.0 * PI),
                clipped,
            };
        }
        spectrum
    }

    /// Main loop; runs until the analyser side hangs up.
    fn run(
        mut self,
        jobs: mpsc::Receiver<WorkerMessage>,
        results: mpsc::Sender<FrequencySpectrum>,
    ) {
        log::debug!("Spectrum worker started (N={})", self.num_samples);
        while let Ok(message) = jobs.recv() {
            match message {
                WorkerMessage::SetWindowFunction => self.calculate_window(),
                WorkerMessage::Calculate(job) => {
                    let spectrum =
                        self.calculate_spectrum(&job.buffer, job.sample_rate, job.bytes_per_frame);
                    if results.send(spectrum).is_err() {
                        break;
                    }
                }
            }
        }
        log::debug!("Spectrum worker stopped");
    }
}

/// Submits spectrum calculations to a dedicated worker thread, with at most one
/// calculation in flight.
///
/// Completions are picked up by [`SpectrumAnalyser::poll`] on the owning thread,
/// so the state flag is only ever touched from there.
pub struct SpectrumAnalyser {
    state: State,
    num_samples: usize,
    jobs: Option<mpsc::Sender<WorkerMessage>>,
    results: mpsc::Receiver<FrequencySpectrum>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SpectrumAnalyser {
    pub fn new() -> Self {
        Self::with_length(SPECTRUM_LENGTH_SAMPLES)
    }

    pub fn with_length(num_samples: usize) -> Self {
        let (job_tx, job_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let worker = AnalyserWorker::new(num_samples);

        let thread = thread::Builder::new()
            .name("spectrum-analyser".into())
            .spawn(move || worker.run(job_rx, result_tx))
            .expect("Failed to spawn spectrum analyser thread");

        Self {
            state: State::Idle,
            num_samples,
            jobs: Some(job_tx),
            results: result_rx,
            thread: Some(thread),
        }
    }

    /// Samples per analysis window.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Idle
    }

    /// Hands a copy of `buffer` to the worker and returns immediately.
    pub fn calculate(&mut self, buffer: &[u8], format: &AudioFormat) {
        debug_assert!(self.is_ready(), "calculate() with a calculation in flight");
        if !self.is_ready() {
            return;
        }
        assert_eq!(format.sample_format, SampleFormat::Int16);
        assert_eq!(buffer.len(), self.num_samples * format.bytes_per_frame());

        let job = CalculationJob {
            buffer: buffer.to_vec(),
            sample_rate: format.sample_rate,
            bytes_per_frame: format.bytes_per_frame(),
        };
        if self.send(WorkerMessage::Calculate(job)) {
            self.state = State::Busy;
        }
    }

    /// The in-flight transform still runs; only its publish is suppressed.
    pub fn cancel_calculation(&mut self) {
        if self.state == State::Busy {
            self.state = State::Cancelled;
        }
    }

    /// Asks the worker to rebuild its window function.
    pub fn set_window_function(&self) {
        self.send(WorkerMessage::SetWindowFunction);
    }

    /// Consumes a finished calculation if there is one. Returns the spectrum
    /// only when it was not cancelled.
    pub fn poll(&mut self) -> Option<FrequencySpectrum> {
        match self.results.try_recv() {
            Ok(spectrum) => self.calculation_complete(spectrum),
            Err(_) => None,
        }
    }

    /// Blocks up to `timeout` for the in-flight calculation.
    #[cfg(test)]
    pub fn wait(&mut self, timeout: std::time::Duration) -> Option<FrequencySpectrum> {
        if self.state == State::Idle {
            return None;
        }
        let spectrum = self.results.recv_timeout(timeout).ok()?;
        self.calculation_complete(spectrum)
    }

    fn calculation_complete(&mut self, spectrum: FrequencySpectrum) -> Option<FrequencySpectrum> {
        debug_assert_ne!(self.state, State::Idle, "completion without a calculation");
        let publish = self.state == State::Busy;
        self.state = State::Idle;
        publish.then_some(spectrum)
    }

    fn send(&self, message: WorkerMessage) -> bool {
        match self.jobs.as_ref().map(|tx| tx.send(message)) {
            Some(Ok(())) => true,
            _ => {
                log::error!("Spectrum worker is gone, dropping request");
                false
            }
        }
    }
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SpectrumAnalyser {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
