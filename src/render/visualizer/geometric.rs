use std::f32::consts::PI;

use image::RgbImage;

use super::{RenderSettings, Visualizer};
use crate::audio::features::FeatureSnapshot;
use crate::render::canvas::{Canvas, Paint};
use crate::render::theme::Band;

const HEXAGON_SIDES: usize = 6;
const NUM_RAYS: usize = 12;

/// Concentric band circles, a rotating hexagon and radiating rays.
/// The only state is the frame counter driving the rotation.
pub struct Geometric {
    settings: RenderSettings,
    center: (f32, f32),
    max_radius: f32,
    frame_index: u64,
}

impl Geometric {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            center: settings.center(),
            max_radius: (settings.width.min(settings.height) / 3) as f32,
            frame_index: 0,
        }
    }

    fn draw_circles(&self, canvas: &mut Canvas, snapshot: &FeatureSnapshot) {
        let bands = snapshot.bands;
        // (band, level, base fraction, weight)
        let rings = [
            (Band::Low, bands.low, 0.3, 0.4),
            (Band::Mid, bands.mid, 0.4, 0.3),
            (Band::High, bands.high, 0.5, 0.3),
        ];
        let stroke = ((snapshot.rms * 8.0).round() as u32).max(1);

        for (band, level, base, weight) in rings {
            let radius = self.max_radius * (base + weight * level);
            if radius <= 10.0 {
                continue;
            }
            let color = self.settings.theme.color(band, level);
            canvas.draw_ellipse(self.center.0, self.center.1, radius, radius, color, Paint::Outline(stroke));
        }
    }

    fn draw_hexagon(&self, canvas: &mut Canvas, snapshot: &FeatureSnapshot) {
        let rotation = self.frame_index as f32 * 0.02;
        let radius = 50.0 + snapshot.rms * 100.0;
        let (cx, cy) = self.center;

        let points: Vec<(f32, f32)> = (0..HEXAGON_SIDES)
            .map(|i| {
                let angle = 2.0 * PI * i as f32 / HEXAGON_SIDES as f32 + rotation;
                (cx + radius * angle.cos(), cy + radius * angle.sin())
            })
            .collect();

        let color = self.settings.theme.color(Band::Mid, snapshot.bands.mid);
        canvas.draw_polygon(&points, color, 3);
    }

    fn draw_rays(&self, canvas: &mut Canvas, snapshot: &FeatureSnapshot) {
        let high = snapshot.bands.high;
        let inner = self.max_radius * 0.6;
        let outer = self.max_radius * (0.8 + high * 0.4);
        let color = self.settings.theme.color(Band::High, high);
        let width = ((high * 4.0) as u32).max(1);
        let (cx, cy) = self.center;

        for i in 0..NUM_RAYS {
            let angle = 2.0 * PI * i as f32 / NUM_RAYS as f32 + self.frame_index as f32 * 0.01;
            let (cos, sin) = (angle.cos(), angle.sin());
            canvas.draw_line(
                (cx + inner * cos, cy + inner * sin),
                (cx + outer * cos, cy + outer * sin),
                color,
                width,
            );
        }
    }
}

impl Visualizer for Geometric {
    fn render_frame(&mut self, snapshot: &FeatureSnapshot) -> RgbImage {
        let mut canvas = self.settings.blank_canvas();

        self.draw_circles(&mut canvas, snapshot);
        self.draw_hexagon(&mut canvas, snapshot);
        self.draw_rays(&mut canvas, snapshot);

        self.frame_index += 1;
        canvas.into_image()
    }

    fn frame_index(&self) -> u64 {
        self.frame_index
    }
}
