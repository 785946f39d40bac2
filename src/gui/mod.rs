pub mod halo;
pub mod theme;

use crate::audio::{pcm_to_real, AudioFormat};
use crate::bars::{bass_level, Bar};
use crate::config::{Settings, MAX_FRAME_RATE};
use crate::engine::{BufferLevel, EngineCommand, EngineEvent, EngineHandle};
use eframe::egui;
use halo::HaloSphere;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use theme::Gradient;

const MIN_BAR_SLIDER: usize = 32;
const MAX_BAR_SLIDER: usize = 1024;
const SILENCE_THRESHOLD: f32 = 0.0001;
const SILENCE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum View {
    Planar,
    Halo,
}

pub struct AnalyzerApp {
    //
    // Engine link. The stream must outlive the app or capture stops.
    //
    engine: EngineHandle,
    events: mpsc::Receiver<EngineEvent>,
    _audio_stream: cpal::Stream,
    format: AudioFormat,
    plan_name: String,

    //
    // Latest published state.
    //
    bars: Arc<[Bar]>,
    halo_amplitudes: Arc<[f32]>,
    level: Option<BufferLevel>,
    peak_frequency: f32,

    //
    // Controls.
    //
    view: View,
    frame_rate: u32,
    bar_count: usize,
    gradient_index: usize,
    gradient: Gradient,
    light_index: usize,
    halo_paused: bool,
    sphere: HaloSphere,

    //
    // Statistics and silence detection.
    //
    last_stats_time: Instant,
    events_received: usize,
    frames_drawn: usize,
    no_signal_timer: Instant,
    is_silence: bool,
}

impl AnalyzerApp {
    pub fn new(
        _cc: &eframe::CreationContext,
        engine: EngineHandle,
        events: mpsc::Receiver<EngineEvent>,
        audio_stream: cpal::Stream,
        format: AudioFormat,
        settings: &Settings,
        plan_name: String,
    ) -> Self {
        Self {
            engine,
            events,
            _audio_stream: audio_stream,
            format,
            plan_name,
            bars: Arc::from(vec![Bar::default(); settings.bar_count]),
            halo_amplitudes: Arc::from(vec![1.0; crate::bars::HALO_BANDS]),
            level: None,
            peak_frequency: 0.0,
            view: View::Planar,
            frame_rate: settings.frame_rate,
            bar_count: settings.bar_count,
            gradient_index: 0,
            gradient: Gradient::default(),
            light_index: 0,
            halo_paused: false,
            sphere: HaloSphere::new(),
            last_stats_time: Instant::now(),
            events_received: 0,
            frames_drawn: 0,
            no_signal_timer: Instant::now(),
            is_silence: true,
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.events_received += 1;
            match event {
                EngineEvent::BufferChanged(level) => {
                    self.detect_silence(&level.tail);
                    self.level = Some(level);
                }
                EngineEvent::SpectrumChanged(spectrum) => {
                    self.peak_frequency = spectrum.peak().map(|e| e.frequency).unwrap_or(0.0);
                }
                EngineEvent::BarsChanged(bars) => self.bars = bars,
                EngineEvent::HaloChanged(amplitudes) => self.halo_amplitudes = amplitudes,
            }
        }

        if self.last_stats_time.elapsed() > Duration::from_secs(1) {
            log::info!(
                "UI | Events: {} | Frames: {} | Peak: {:.0} Hz | Silence: {}",
                self.events_received,
                self.frames_drawn,
                self.peak_frequency,
                self.is_silence
            );
            self.events_received = 0;
            self.frames_drawn = 0;
            self.last_stats_time = Instant::now();
        }
    }

    //
    // Silence detection (-80 dB threshold, 2-second timeout).
    //
    fn detect_silence(&mut self, tail: &[u8]) {
        let peak = tail
            .chunks_exact(2)
            .map(|b| pcm_to_real(i16::from_le_bytes([b[0], b[1]])).abs())
            .fold(0.0f32, f32::max);

        if peak > SILENCE_THRESHOLD {
            self.no_signal_timer = Instant::now();
            self.is_silence = false;
        } else if self.no_signal_timer.elapsed() > SILENCE_TIMEOUT {
            self.is_silence = true;
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let fps = self.frame_rate;
            ui.add(egui::Slider::new(&mut self.frame_rate, 1..=MAX_FRAME_RATE).text("FPS"));
            if fps != self.frame_rate {
                self.engine.send(EngineCommand::SetFrameRate(self.frame_rate));
            }

            let bars = self.bar_count;
            ui.add(
                egui::Slider::new(&mut self.bar_count, MIN_BAR_SLIDER..=MAX_BAR_SLIDER)
                    .text("Bars"),
            );
            if bars != self.bar_count {
                self.engine.send(EngineCommand::SetBarCount(self.bar_count));
            }
        });

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.view, View::Planar, "2D");
            ui.selectable_value(&mut self.view, View::Halo, "3D");
            ui.separator();

            match self.view {
                View::Planar => {
                    let index = self.gradient_index;
                    egui::ComboBox::from_label("Gradient")
                        .selected_text(theme::GRADIENT_PRESETS[self.gradient_index].0)
                        .show_ui(ui, |ui| {
                            for (i, (name, _)) in theme::GRADIENT_PRESETS.iter().enumerate() {
                                ui.selectable_value(&mut self.gradient_index, i, *name);
                            }
                        });
                    if index != self.gradient_index {
                        let (_, stops) = theme::GRADIENT_PRESETS[self.gradient_index];
                        if let Some(gradient) = Gradient::parse(stops) {
                            self.gradient = gradient;
                        }
                    }
                }
                View::Halo => {
                    egui::ComboBox::from_label("Light")
                        .selected_text(theme::LIGHT_COLORS[self.light_index].0)
                        .show_ui(ui, |ui| {
                            for (i, (name, _)) in theme::LIGHT_COLORS.iter().enumerate() {
                                ui.selectable_value(&mut self.light_index, i, *name);
                            }
                        });
                    if ui.checkbox(&mut self.halo_paused, "Pause").changed() {
                        self.engine.send(EngineCommand::SetHaloPaused(self.halo_paused));
                    }
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Restart").clicked() {
                    self.engine.send(EngineCommand::Restart);
                }
            });
        });

        //
        // Capture buffer fill meter.
        //
        let (filled, text) = match &self.level {
            Some(level) if level.capacity > 0 => {
                let seconds = level.data_length as f32
                    / (self.format.bytes_per_frame() as f32 * self.format.sample_rate as f32);
                (
                    level.data_length as f32 / level.capacity as f32,
                    format!("{:.1} s recorded", seconds),
                )
            }
            _ => (0.0, "idle".to_owned()),
        };
        ui.add(egui::ProgressBar::new(filled).text(text));
    }

    fn draw_planar(&self, ui: &mut egui::Ui) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, egui::Color32::BLACK);

        let count = self.bars.len();
        if count < 2 {
            return;
        }
        let step = rect.width() / (count - 1) as f32;
        let bar_width = (step * 0.8).max(1.0);

        for (i, bar) in self.bars.iter().enumerate() {
            let value = bar.value.clamp(0.0, 1.0);
            let x = rect.min.x + i as f32 * step;
            let top = rect.max.y - value * rect.height() - 1.0;
            let color = if bar.clipped {
                egui::Color32::WHITE
            } else {
                self.gradient.color_at(i as f32 / (count - 1) as f32)
            };
            painter.rect_filled(
                egui::Rect::from_min_max(egui::pos2(x, top), egui::pos2(x + bar_width, rect.max.y)),
                0.0,
                color,
            );
        }

        //
        // Bass glow: soft blobs stacked up each sampled bar.
        //
        let bass = bass_level(&self.bars);
        if bass > 0.01 {
            let radius = rect.height() / 8.0;
            let stride = count.div_ceil(128);
            let alpha = (15.0 * bass).clamp(0.0, 255.0) as u8;

            for i in (0..count).step_by(stride) {
                let t = i as f32 / (count - 1) as f32;
                let c = self.gradient.color_at(t);
                let glow = egui::Color32::from_rgba_unmultiplied(c.r(), c.g(), c.b(), alpha);
                let x = rect.min.x + i as f32 * step;
                let mut y = rect.max.y - self.bars[i].value.clamp(0.0, 1.0) * rect.height() - 1.0;
                while y < rect.max.y {
                    painter.circle_filled(egui::pos2(x, y), radius, glow);
                    y += radius;
                }
            }
        }
    }

    fn draw_halo(&self, ui: &mut egui::Ui) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        let light = theme::LIGHT_COLORS[self.light_index].1;
        self.sphere.paint(&painter, rect, &self.halo_amplitudes, light);
    }
}

impl eframe::App for AnalyzerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.frames_drawn += 1;
        ctx.request_repaint();

        egui::CentralPanel::default().show(ctx, |ui| {
            let status = format!(
                "{} | {} Hz x{} | peak {:.0} Hz",
                self.plan_name, self.format.sample_rate, self.format.channels, self.peak_frequency
            );
            theme::draw_menu_bar(ui, &status);
            ui.add_space(4.0);

            theme::draw_platinum_window(ui, "Controls", |ui| self.draw_controls(ui));
            ui.add_space(4.0);

            let title = match self.view {
                View::Planar => "Spectrum",
                View::Halo => "Halo",
            };
            theme::draw_platinum_window(ui, title, |ui| {
                egui::Frame::canvas(ui.style()).show(ui, |ui| {
                    match self.view {
                        View::Planar => self.draw_planar(ui),
                        View::Halo => self.draw_halo(ui),
                    }

                    if self.is_silence {
                        ui.painter().text(
                            ui.min_rect().center(),
                            egui::Align2::CENTER_CENTER,
                            "NO SIGNAL\nCheck the input device and its permissions",
                            egui::FontId::proportional(20.0),
                            egui::Color32::RED,
                        );
                    }
                });
            });
        });
    }
}
