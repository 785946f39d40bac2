use eframe::egui;

pub const PLATINUM_BG: egui::Color32 = egui::Color32::from_rgb(212, 208, 200);
pub const PLATINUM_DARK: egui::Color32 = egui::Color32::from_rgb(128, 128, 128);

/// Bar gradient presets, low frequencies first.
pub const GRADIENT_PRESETS: [(&str, &str); 2] = [
    ("Red to blue", "#FF0000 #FF00FF #00FF00 #00FFFF #0000FF"),
    ("Blue to red", "#0000FF #00FFFF #00FF00 #FF00FF #FF0000"),
];

/// Halo light color presets.
pub const LIGHT_COLORS: [(&str, egui::Color32); 5] = [
    ("Red", egui::Color32::from_rgb(255, 0, 0)),
    ("Magenta", egui::Color32::from_rgb(255, 0, 255)),
    ("Green", egui::Color32::from_rgb(0, 255, 0)),
    ("Cyan", egui::Color32::from_rgb(0, 255, 255)),
    ("Blue", egui::Color32::from_rgb(0, 0, 255)),
];

pub fn setup_global_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    //
    // Set global background fill colors.
    //
    style.visuals.panel_fill = PLATINUM_BG;
    style.visuals.window_fill = PLATINUM_BG;

    //
    // Square widgets.
    //
    style.visuals.widgets.noninteractive.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.active.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.inactive.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.hovered.rounding = egui::Rounding::ZERO;

    ctx.set_style(style);
}

/// Draws the title bar with a status label on the right.
pub fn draw_menu_bar(ui: &mut egui::Ui, status: &str) {
    egui::TopBottomPanel::top("menubar").show_inside(ui, |ui| {
        ui.visuals_mut().widgets.noninteractive.bg_fill = PLATINUM_BG;
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("spectrumbars").strong());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(egui::RichText::new(status).italics().size(10.0));
            });
        });
    });
}

/// Draws a window styled with the "Platinum" retro frame.
pub fn draw_platinum_window<F: FnOnce(&mut egui::Ui)>(ui: &mut egui::Ui, title: &str, content: F) {
    let frame = egui::Frame::none()
        .fill(PLATINUM_BG)
        .stroke(egui::Stroke::new(1.0, egui::Color32::BLACK))
        .inner_margin(2.0);

    frame.show(ui, |ui| {
        //
        // Pinstriped title bar.
        //
        let title_height = 18.0;
        let (rect, _response) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), title_height),
            egui::Sense::hover(),
        );
        ui.painter()
            .rect_filled(rect, 0.0, egui::Color32::from_rgb(200, 200, 200));
        for i in (0..rect.width() as i32).step_by(2) {
            let x = rect.min.x + i as f32;
            ui.painter().line_segment(
                [
                    egui::Pos2::new(x, rect.min.y),
                    egui::Pos2::new(x, rect.max.y),
                ],
                egui::Stroke::new(
                    1.0,
                    egui::Color32::from_rgba_premultiplied(255, 255, 255, 50),
                ),
            );
        }
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            title,
            egui::FontId::proportional(14.0),
            egui::Color32::BLACK,
        );

        ui.add_space(4.0);
        egui::Frame::group(ui.style())
            .stroke(egui::Stroke::new(1.0, PLATINUM_DARK))
            .inner_margin(6.0)
            .show(ui, content);
    });
}

/// Evenly spaced color stops across [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    stops: Vec<egui::Color32>,
}

impl Gradient {
    /// Parses a space separated list of `#RRGGBB` colors. At least two are
    /// required.
    pub fn parse(text: &str) -> Option<Self> {
        let stops = text
            .split_whitespace()
            .map(parse_hex_color)
            .collect::<Option<Vec<_>>>()?;
        (stops.len() >= 2).then_some(Self { stops })
    }

    /// Linear interpolation between the two stops around `t`.
    pub fn color_at(&self, t: f32) -> egui::Color32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let segments = self.stops.len() - 1;
        let scaled = t * segments as f32;
        let index = (scaled as usize).min(segments - 1);
        let frac = scaled - index as f32;

        let (a, b) = (self.stops[index], self.stops[index + 1]);
        let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * frac).round() as u8;
        egui::Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self::parse(GRADIENT_PRESETS[0].1).unwrap_or(Self {
            stops: vec![egui::Color32::RED, egui::Color32::BLUE],
        })
    }
}

fn parse_hex_color(s: &str) -> Option<egui::Color32> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some(egui::Color32::from_rgb(
        (value >> 16) as u8,
        (value >> 8) as u8,
        value as u8,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_parse() {
        for (name, text) in GRADIENT_PRESETS {
            let gradient =
                Gradient::parse(text).unwrap_or_else(|| panic!("{name} failed to parse"));
            assert_eq!(gradient.stops.len(), 5);
        }
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(Gradient::parse("").is_none());
        assert!(Gradient::parse("#FF0000").is_none());
        assert!(Gradient::parse("#FF0000 blue").is_none());
        assert!(Gradient::parse("#FF00 #00FF00").is_none());
    }

    #[test]
    fn endpoints_hit_first_and_last_stop() {
        let gradient = Gradient::default();
        assert_eq!(gradient.color_at(0.0), egui::Color32::from_rgb(255, 0, 0));
        assert_eq!(gradient.color_at(1.0), egui::Color32::from_rgb(0, 0, 255));
        assert_eq!(gradient.color_at(0.25), egui::Color32::from_rgb(255, 0, 255));
    }

    #[test]
    fn interpolates_between_stops() {
        let gradient = Gradient::parse("#000000 #FF8040").unwrap();
        assert_eq!(gradient.color_at(0.5), egui::Color32::from_rgb(128, 64, 32));
    }

    #[test]
    fn out_of_range_is_clamped() {
        let gradient = Gradient::default();
        assert_eq!(gradient.color_at(-3.0), gradient.color_at(0.0));
        assert_eq!(gradient.color_at(7.0), gradient.color_at(1.0));
        assert_eq!(gradient.color_at(f32::NAN), gradient.color_at(0.0));
    }
}
