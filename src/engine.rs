//! Capture-side loop: drains the sample source into the capture buffer, ticks
//! the notification clock, submits spectrum windows and publishes results.

use crate::audio::{AudioFormat, CaptureBuffer, SampleSource};
use crate::bars::{Bar, BarMapper, BarMapperParams};
use crate::clock::NotificationClock;
use crate::config::Settings;
use crate::spectrum::{FrequencySpectrum, SpectrumAnalyser};
use std::sync::mpsc::{self, RecvTimeoutError, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest the loop waits for device data between clock ticks.
const DATA_POLL_INTERVAL: Duration = Duration::from_millis(2);
/// Loop period while the clock is stopped.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);
const STATS_INTERVAL: Duration = Duration::from_secs(1);
/// Events a subscriber may fall behind by before new ones are dropped.
pub const SUBSCRIBER_QUEUE_LEN: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineCommand {
    Start,
    Stop,
    /// Stop, reset and start again; re-arms a full capture buffer.
    Restart,
    SetFrameRate(u32),
    SetBarCount(usize),
    SetHaloPaused(bool),
    Shutdown,
}

/// Capture buffer state published on every tick.
#[derive(Clone, Debug)]
pub struct BufferLevel {
    pub data_length: usize,
    pub capacity: usize,
    /// Most recent raw bytes, at most one spectrum window long.
    pub tail: Arc<[u8]>,
}

#[derive(Clone, Debug)]
pub enum EngineEvent {
    BufferChanged(BufferLevel),
    SpectrumChanged(Arc<FrequencySpectrum>),
    BarsChanged(Arc<[Bar]>),
    HaloChanged(Arc<[f32]>),
}

#[derive(Default)]
struct Stats {
    ticks: usize,
    submitted: usize,
    published: usize,
    skipped: usize,
    dropped: usize,
}

pub struct Engine {
    source: Box<dyn SampleSource>,
    format: AudioFormat,
    capture_duration_us: u64,
    low_freq: f32,
    high_freq: f32,

    buffer: CaptureBuffer,
    recording: bool,

    //
    // Spectrum window bookkeeping.
    //
    spectrum_buffer_length: usize,
    analysed_until: usize,
    analyser: SpectrumAnalyser,

    clock: NotificationClock,
    planar: BarMapper,
    halo: BarMapper,
    halo_paused: bool,

    subscribers: Vec<mpsc::SyncSender<EngineEvent>>,
    stats: Stats,
    last_stats_time: Instant,
}

impl Engine {
    pub fn new(source: Box<dyn SampleSource>, format: AudioFormat, settings: &Settings) -> Self {
        Self::with_analyser(source, format, settings, SpectrumAnalyser::new())
    }

    pub fn with_analyser(
        source: Box<dyn SampleSource>,
        format: AudioFormat,
        settings: &Settings,
        analyser: SpectrumAnalyser,
    ) -> Self {
        let mut engine = Self {
            source,
            format,
            capture_duration_us: settings.capture_duration_us,
            low_freq: settings.low_freq,
            high_freq: settings.high_freq,
            buffer: CaptureBuffer::new(0),
            recording: false,
            spectrum_buffer_length: 0,
            analysed_until: 0,
            analyser,
            clock: NotificationClock::new(settings.frame_rate),
            planar: BarMapper::new(BarMapperParams::planar(
                settings.bar_count,
                settings.low_freq,
                settings.high_freq,
            )),
            halo: BarMapper::new(BarMapperParams::halo(settings.low_freq, settings.high_freq)),
            halo_paused: false,
            subscribers: Vec::new(),
            stats: Stats::default(),
            last_stats_time: Instant::now(),
        };
        engine.set_format(format);
        engine
    }

    /// Registers a new event receiver. A receiver that stops draining loses
    /// events once its queue is full.
    pub fn subscribe(&mut self) -> mpsc::Receiver<EngineEvent> {
        let (tx, rx) = mpsc::sync_channel(SUBSCRIBER_QUEUE_LEN);
        self.subscribers.push(tx);
        rx
    }

    /// Resizes the capture buffer for `format` and recomputes the window length.
    pub fn set_format(&mut self, format: AudioFormat) {
        assert!(format.is_valid(), "invalid audio format {:?}", format);
        self.format = format;
        self.spectrum_buffer_length = self.analyser.num_samples() * format.bytes_per_frame();
        assert!(self.spectrum_buffer_length % 2 == 0);

        self.buffer.resize(format.bytes_for_duration(self.capture_duration_us));
        self.analysed_until = 0;
        self.analyser.set_window_function();
        log::info!(
            "Capture buffer: {} bytes ({} Hz, {} ch), spectrum window: {} bytes",
            self.buffer.capacity(),
            format.sample_rate,
            format.channels,
            self.spectrum_buffer_length
        );
        self.publish_buffer();
    }

    pub fn start_recording(&mut self, now: Instant) {
        //
        // Drop whatever the worker is computing and blank the views.
        //
        self.analyser.cancel_calculation();
        self.publish_spectrum(FrequencySpectrum::default());

        self.buffer.reset();
        self.analysed_until = 0;
        self.source.discard();

        self.recording = true;
        self.clock.start(now);
        log::info!("Recording started");
    }

    pub fn stop_recording(&mut self) {
        if self.recording {
            log::info!("Recording stopped at {} bytes", self.buffer.data_length());
        }
        self.recording = false;
        self.clock.stop();
    }

    pub fn reset(&mut self) {
        self.stop_recording();
        self.buffer.reset();
        self.analysed_until = 0;
        self.planar.reset();
        self.halo.reset();
        self.publish_buffer();
    }

    pub fn restart(&mut self, now: Instant) {
        self.stop_recording();
        self.reset();
        self.start_recording(now);
    }

    pub fn set_frame_rate(&mut self, frame_rate: u32, now: Instant) {
        self.clock.set_frame_rate(frame_rate, now);
        log::info!(
            "Frame rate set to {} ({} ms per tick)",
            frame_rate,
            self.clock.interval().as_millis()
        );
    }

    pub fn set_bar_count(&mut self, bar_count: usize) {
        self.planar.set_params(bar_count, self.low_freq, self.high_freq);
        log::info!("Bar count set to {}", bar_count);
    }

    pub fn set_halo_paused(&mut self, paused: bool) {
        self.halo_paused = paused;
    }

    /// Moves available device bytes into the capture buffer. Halts capture
    /// once the buffer is full.
    pub fn audio_data_ready(&mut self) -> usize {
        if !self.recording {
            return 0;
        }
        let read = self.buffer.append_from(self.source.as_mut());
        if self.buffer.is_full() {
            log::info!(
                "Capture buffer full ({} bytes), halting until restart",
                self.buffer.capacity()
            );
            self.stop_recording();
        }
        read
    }

    /// One clock tick: submit a fresh window if one has accumulated, then
    /// publish the buffer state.
    pub fn audio_notify(&mut self) {
        if !self.recording {
            return;
        }
        self.stats.ticks += 1;

        let data_length = self.buffer.data_length();
        let window = self.spectrum_buffer_length;
        if data_length >= self.analysed_until + window {
            self.calculate_spectrum(data_length - window);
        }
        self.publish_buffer();
    }

    fn calculate_spectrum(&mut self, position: usize) {
        assert!(position + self.spectrum_buffer_length <= self.buffer.data_length());
        assert!(self.spectrum_buffer_length % 2 == 0);

        if !self.analyser.is_ready() {
            self.stats.skipped += 1;
            log::trace!("Analyser busy, skipping window at {}", position);
            return;
        }
        if let Some(window) = self.buffer.window(position, self.spectrum_buffer_length) {
            self.analyser.calculate(window, &self.format);
            self.analysed_until = position + self.spectrum_buffer_length;
            self.stats.submitted += 1;
        }
    }

    /// Publishes a finished, non-cancelled calculation and the bars built from it.
    pub fn process_completions(&mut self) -> bool {
        match self.analyser.poll() {
            Some(spectrum) => {
                self.stats.published += 1;
                self.publish_spectrum(spectrum);
                true
            }
            None => false,
        }
    }

    fn publish_spectrum(&mut self, spectrum: FrequencySpectrum) {
        self.planar.update(&spectrum);
        if !self.halo_paused {
            self.halo.update(&spectrum);
        }

        self.publish(EngineEvent::SpectrumChanged(Arc::new(spectrum)));
        self.publish(EngineEvent::BarsChanged(Arc::from(self.planar.bars())));
        if !self.halo_paused {
            self.publish(EngineEvent::HaloChanged(Arc::from(self.halo.values())));
        }
    }

    fn publish_buffer(&mut self) {
        let level = BufferLevel {
            data_length: self.buffer.data_length(),
            capacity: self.buffer.capacity(),
            tail: Arc::from(self.buffer.tail(self.spectrum_buffer_length)),
        };
        self.publish(EngineEvent::BufferChanged(level));
    }

    fn publish(&mut self, event: EngineEvent) {
        let dropped = &mut self.stats.dropped;
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                *dropped += 1;
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// One pass of the loop: completions first, then device data, then the clock.
    pub fn step(&mut self, now: Instant) {
        self.process_completions();
        self.audio_data_ready();
        if self.clock.poll(now) {
            self.audio_notify();
        }

        if now.duration_since(self.last_stats_time) > STATS_INTERVAL {
            log::info!(
                "ENGINE | Rate: {} fps | Ticks: {} | Submitted: {} | Published: {} | Skipped: {} \
                 | Dropped: {} | Buffer: {}/{}",
                self.clock.frame_rate(),
                self.stats.ticks,
                self.stats.submitted,
                self.stats.published,
                self.stats.skipped,
                self.stats.dropped,
                self.buffer.data_length(),
                self.buffer.capacity()
            );
            self.stats = Stats::default();
            self.last_stats_time = now;
        }
    }

    /// Applies a command; returns false on shutdown.
    pub fn handle(&mut self, command: EngineCommand, now: Instant) -> bool {
        log::debug!("Engine command: {:?}", command);
        match command {
            EngineCommand::Start => self.start_recording(now),
            EngineCommand::Stop => self.stop_recording(),
            EngineCommand::Restart => self.restart(now),
            EngineCommand::SetFrameRate(fps) => self.set_frame_rate(fps, now),
            EngineCommand::SetBarCount(count) => self.set_bar_count(count),
            EngineCommand::SetHaloPaused(paused) => self.set_halo_paused(paused),
            EngineCommand::Shutdown => return false,
        }
        true
    }

    /// Runs the loop on the current thread until shutdown or until every
    /// command sender is gone.
    pub fn run(mut self, commands: mpsc::Receiver<EngineCommand>) {
        loop {
            let now = Instant::now();
            self.step(now);

            let wait = self
                .clock
                .time_until_next(now)
                .unwrap_or(IDLE_POLL_INTERVAL)
                .min(DATA_POLL_INTERVAL);

            match commands.recv_timeout(wait) {
                Ok(command) => {
                    if !self.handle(command, Instant::now()) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.stop_recording();
        log::info!("Engine stopped");
    }

    /// Moves the engine onto its own thread.
    pub fn spawn(self) -> EngineHandle {
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("engine".into())
            .spawn(move || self.run(rx))
            .expect("Failed to spawn engine thread");
        EngineHandle {
            commands: tx,
            thread: Some(thread),
        }
    }
}

/// Control side of a spawned engine. Dropping it shuts the engine down.
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn send(&self, command: EngineCommand) {
        if self.commands.send(command).is_err() {
            log::warn!("Engine is not running, dropped {:?}", command);
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(EngineCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
