use crate::config::{Settings, DEFAULT_HIGH_FREQ, DEFAULT_LOW_FREQ};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "spectrumbars", about = "Real-time audio spectrum bars and halo visualizer")]
pub struct Cli {
    /// Analysis and repaint rate (frames per second, 1-120)
    #[arg(long, default_value_t = 120)]
    pub fps: u32,

    /// Number of planar bars
    #[arg(long, default_value_t = 128)]
    pub bars: usize,

    /// Lower edge of the analyzed band in Hz
    #[arg(long, default_value_t = DEFAULT_LOW_FREQ)]
    pub low_freq: f32,

    /// Upper edge of the analyzed band in Hz
    #[arg(long, default_value_t = DEFAULT_HIGH_FREQ)]
    pub high_freq: f32,

    /// Length of the capture window in seconds; capture halts once it is full
    #[arg(long, default_value_t = 100.0)]
    pub capture_seconds: f64,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            frame_rate: self.fps,
            bar_count: self.bars,
            low_freq: self.low_freq,
            high_freq: self.high_freq,
            capture_duration_us: (self.capture_seconds.max(0.0) * 1_000_000.0) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings_defaults() {
        let cli = Cli::try_parse_from(["spectrumbars"]).unwrap();
        assert_eq!(cli.settings(), Settings::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "spectrumbars",
            "--fps",
            "60",
            "--bars",
            "256",
            "--capture-seconds",
            "2.5",
        ])
        .unwrap();
        let settings = cli.settings();
        assert_eq!(settings.frame_rate, 60);
        assert_eq!(settings.bar_count, 256);
        assert_eq!(settings.capture_duration_us, 2_500_000);
    }
}
