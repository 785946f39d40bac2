//! Sphere of halo points, one ring per frequency band, pushed outward by
//! that band's amplitude and drawn with an orthographic projection.

use crate::bars::HALO_BANDS;
use eframe::egui;

/// Points per band ring.
pub const HALO_RING_POINTS: usize = 35;
const SPHERE_RADIUS: f32 = 3.0;
const POLAR_STEP_DEG: i32 = 170 / HALO_BANDS as i32;
const POLAR_OFFSET_DEG: i32 = 10;
const AZIMUTH_STEP_DEG: i32 = 360 / HALO_RING_POINTS as i32;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    fn scaled(self, k: f32) -> Self {
        Self {
            x: self.x * k,
            y: self.y * k,
            z: self.z * k,
        }
    }
}

pub struct HaloSphere {
    /// Rest positions, indexed `[band][ring point]`.
    rest: Vec<[Point3; HALO_RING_POINTS]>,
}

impl HaloSphere {
    pub fn new() -> Self {
        let rest = (0..HALO_BANDS)
            .map(|band| {
                let polar = ((band as i32 * POLAR_STEP_DEG + POLAR_OFFSET_DEG) as f32).to_radians();
                std::array::from_fn(|j| {
                    let azimuth = ((j as i32 * AZIMUTH_STEP_DEG) as f32).to_radians();
                    Point3 {
                        x: SPHERE_RADIUS * azimuth.sin() * polar.sin(),
                        y: SPHERE_RADIUS * azimuth.cos() * polar.sin(),
                        z: SPHERE_RADIUS * polar.cos(),
                    }
                })
            })
            .collect();
        Self { rest }
    }

    /// Positions after scaling each ring by its band amplitude. Missing
    /// amplitudes leave the ring at rest.
    pub fn displaced<'a>(&'a self, amplitudes: &'a [f32]) -> impl Iterator<Item = (usize, Point3)> + 'a {
        self.rest.iter().enumerate().flat_map(move |(band, ring)| {
            let k = amplitudes.get(band).copied().unwrap_or(1.0);
            ring.iter().map(move |p| (band, p.scaled(k)))
        })
    }

    /// Paints the sphere into `rect`; nearer points are brighter and larger.
    pub fn paint(
        &self,
        painter: &egui::Painter,
        rect: egui::Rect,
        amplitudes: &[f32],
        light: egui::Color32,
    ) {
        painter.rect_filled(rect, 0.0, egui::Color32::BLACK);

        let peak = amplitudes.iter().copied().fold(1.0f32, f32::max);
        let extent = SPHERE_RADIUS * peak.max(1.0) * 1.1;
        let scale = 0.5 * rect.width().min(rect.height()) / extent;
        let center = rect.center();

        for (_, p) in self.displaced(amplitudes) {
            let depth = (p.x / (extent * 2.0) + 0.5).clamp(0.0, 1.0);
            let pos = egui::pos2(center.x + p.y * scale, center.y - p.z * scale);
            let shade = 0.25 + 0.75 * depth;
            let color = egui::Color32::from_rgb(
                (light.r() as f32 * shade) as u8,
                (light.g() as f32 * shade) as u8,
                (light.b() as f32 * shade) as u8,
            );
            painter.circle_filled(pos, 1.5 + 2.0 * depth, color);
        }
    }
}

impl Default for HaloSphere {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(p: Point3) -> f32 {
        (p.x * p.x + p.y * p.y + p.z * p.z).sqrt()
    }

    #[test]
    fn rest_points_lie_on_sphere() {
        let sphere = HaloSphere::new();
        assert_eq!(sphere.rest.len(), HALO_BANDS);
        for ring in &sphere.rest {
            for &p in ring {
                assert!((norm(p) - SPHERE_RADIUS).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn rings_step_down_from_the_pole() {
        let sphere = HaloSphere::new();
        let rest = &sphere.rest;
        // First ring sits 10 degrees off the pole, each next one 8 further.
        assert!((rest[0][0].z - SPHERE_RADIUS * 10f32.to_radians().cos()).abs() < 1e-4);
        assert!((rest[1][0].z - SPHERE_RADIUS * 18f32.to_radians().cos()).abs() < 1e-4);
        assert!(rest[HALO_BANDS - 1][0].z < 0.0);
    }

    #[test]
    fn amplitude_scales_its_ring_only() {
        let sphere = HaloSphere::new();
        let mut amplitudes = vec![1.0; HALO_BANDS];
        amplitudes[3] = 2.0;

        for (band, p) in sphere.displaced(&amplitudes) {
            let expected = if band == 3 { 2.0 * SPHERE_RADIUS } else { SPHERE_RADIUS };
            assert!((norm(p) - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn short_amplitude_slice_leaves_rest() {
        let sphere = HaloSphere::new();
        let points: Vec<_> = sphere.displaced(&[]).collect();
        assert_eq!(points.len(), HALO_BANDS * HALO_RING_POINTS);
        assert!(points.iter().all(|(_, p)| (norm(*p) - SPHERE_RADIUS).abs() < 1e-4));
    }
}
