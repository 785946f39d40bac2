mod audio;
mod bars;
mod cli;
mod clock;
mod config;
mod engine;
mod fft;
mod gui;
mod spectrum;

use anyhow::{anyhow, Context};
use clap::Parser;
use engine::Engine;
use gui::AnalyzerApp;

/// Device-side queue between the capture callback and the engine.
const CAPTURE_QUEUE_US: u64 = 1_000_000;

fn main() -> anyhow::Result<()> {
    //
    // Initialize logging with default filter set to "info".
    //
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    let settings = cli.settings();
    settings.validate().context("Invalid settings")?;

    log::info!("Starting spectrum visualizer...");

    //
    // Warm the transform plan cache before the worker needs it.
    //
    let plan_name = fft::find_dft(spectrum::SPECTRUM_LENGTH_SAMPLES).name();
    log::info!("Using {} for N={}", plan_name, spectrum::SPECTRUM_LENGTH_SAMPLES);

    //
    // Initialize audio capture subsystem.
    //
    log::info!("Initializing audio capture...");
    let (audio_stream, source, format) =
        audio::start_capture(CAPTURE_QUEUE_US).context("Failed to start audio capture")?;

    //
    // The engine owns the source and runs on its own thread.
    //
    let mut engine = Engine::new(Box::new(source), format, &settings);
    let events = engine.subscribe();
    let handle = engine.spawn();
    handle.send(engine::EngineCommand::Start);

    log::info!("Initializing GUI...");
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([900.0, 640.0])
            .with_min_inner_size([600.0, 480.0])
            .with_title("spectrumbars"),
        ..Default::default()
    };

    eframe::run_native(
        "spectrumbars",
        options,
        Box::new(move |cc| {
            gui::theme::setup_global_style(&cc.egui_ctx);

            Ok(Box::new(AnalyzerApp::new(
                cc,
                handle,
                events,
                audio_stream,
                format,
                &settings,
                plan_name,
            )))
        }),
    )
    .map_err(|e| anyhow!("GUI failed: {e}"))
}
