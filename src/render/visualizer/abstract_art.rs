use std::collections::VecDeque;

use image::RgbImage;

use super::{RenderSettings, Visualizer};
use crate::audio::features::FeatureSnapshot;
use crate::render::canvas::{Canvas, Paint};
use crate::render::theme::{scale, Band};

/// Number of past waveforms kept on screen.
pub const HISTORY_LEN: usize = 100;

const NUM_BARS: usize = 32;
const BAR_SPACING: i64 = 2;
const NUM_RINGS: usize = 5;

/// Fading trail of past waveforms over low-frequency bars and a pulsing
/// aura in the middle.
pub struct AbstractFlow {
    settings: RenderSettings,
    history: VecDeque<Vec<f32>>,
    frame_index: u64,
}

impl AbstractFlow {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            history: VecDeque::with_capacity(HISTORY_LEN),
            frame_index: 0,
        }
    }

    /// Append to the trail, evicting the oldest waveform when full.
    fn remember(&mut self, waveform: &[f32]) {
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(waveform.to_vec());
    }

    fn draw_waveforms(&mut self, canvas: &mut Canvas, waveform: &[f32], rms: f32) {
        if waveform.len() < 2 {
            return;
        }
        self.remember(waveform);

        let width = self.settings.width as usize;
        let y_offset = (self.settings.height / 2) as f32;
        let amplitude = (self.settings.height / 4) as f32 * (0.5 + rms);
        let count = self.history.len();

        // Oldest first so the newest trace ends up on top
        for (i, wf) in self.history.iter().enumerate() {
            let opacity = (i + 1) as f32 / count as f32;
            let step = (wf.len() / width.max(1)).max(1);

            let points: Vec<(f32, f32)> = (0..wf.len().min(width))
                .step_by(step)
                .map(|x| {
                    let idx = x * wf.len() / width;
                    (x as f32, y_offset + (wf[idx] * amplitude).trunc())
                })
                .collect();

            if points.len() > 1 {
                let color = scale(self.settings.theme.color(Band::Mid, opacity * rms), opacity);
                canvas.draw_polyline(&points, color, 2);
            }
        }
    }

    fn draw_frequency_bars(&self, canvas: &mut Canvas, spectrum: &[f32], intensity: f32) {
        if spectrum.len() < 2 {
            return;
        }

        let width = self.settings.width as i64;
        let height = self.settings.height as i64;
        let bar_width = width / NUM_BARS as i64;
        if bar_width <= 2 * BAR_SPACING {
            return;
        }

        // Lowest quarter of the spectrum
        let low_slice = &spectrum[..spectrum.len() / 4];
        let step = (low_slice.len() / NUM_BARS).max(1);

        for i in 0..NUM_BARS {
            let idx = i * step;
            let Some(&magnitude) = low_slice.get(idx) else {
                break;
            };

            let bar_height = ((magnitude / 255.0) * height as f32 * 0.7) as i64;
            let bar_height = bar_height.min(height * 9 / 10).max(5);

            let band = if i < NUM_BARS / 3 {
                Band::Low
            } else if i < 2 * NUM_BARS / 3 {
                Band::Mid
            } else {
                Band::High
            };
            let color = self.settings.theme.color(band, intensity);

            let x = i as i64 * bar_width;
            canvas.fill_rect(
                x + BAR_SPACING,
                height - bar_height,
                x + bar_width - BAR_SPACING,
                height,
                color,
            );
        }
    }

    fn draw_aura(&self, canvas: &mut Canvas, snapshot: &FeatureSnapshot) {
        let bands = snapshot.bands;
        let (cx, cy) = self.settings.center();
        let theme = &self.settings.theme;

        for i in 0..NUM_RINGS {
            let pulse = ((self.frame_index as f32 * 0.1 + i as f32).sin() * 5.0 * bands.low).trunc();
            let radius = 50.0 + 40.0 * i as f32 + (bands.mid * 30.0).trunc() + pulse;
            let color = theme.color(Band::Mid, bands.mid * (1.0 - i as f32 * 0.15));
            canvas.draw_ellipse(cx, cy, radius, radius, color, Paint::Outline(2));
        }

        let inner = 30.0 + (bands.high * 40.0).trunc();
        canvas.draw_ellipse(cx, cy, inner, inner, theme.color(Band::High, bands.high), Paint::Filled);
    }
}

impl Visualizer for AbstractFlow {
    fn render_frame(&mut self, snapshot: &FeatureSnapshot) -> RgbImage {
        let mut canvas = self.settings.blank_canvas();

        self.draw_waveforms(&mut canvas, &snapshot.waveform, snapshot.rms);
        self.draw_frequency_bars(&mut canvas, &snapshot.spectrum, snapshot.bands.mid);
        self.draw_aura(&mut canvas, snapshot);

        self.frame_index += 1;
        canvas.into_image()
    }

    fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::Bands;
    use crate::render::theme::{Theme, ThemeName};

    fn settings() -> RenderSettings {
        RenderSettings {
            width: 320,
            height: 240,
            theme: Theme::get(ThemeName::Neon),
        }
    }

    fn snapshot(frame: usize) -> FeatureSnapshot {
        FeatureSnapshot {
            rms: 0.5,
            spectrum: (0..1025).map(|i| (i % 50) as f32).collect(),
            waveform: (0..1024).map(|i| ((i + frame) as f32 * 0.05).sin()).collect(),
            bands: Bands::new(1.0, 0.5, 0.25),
        }
    }

    #[test]
    fn history_is_bounded_fifo() {
        let mut vis = AbstractFlow::new(settings());
        for frame in 0..130 {
            vis.render_frame(&snapshot(frame));
            assert_eq!(vis.history.len(), (frame + 1).min(HISTORY_LEN));
        }
        // oldest entries were evicted first
        assert_eq!(vis.history.front(), Some(&snapshot(30).waveform));
        assert_eq!(vis.history.back(), Some(&snapshot(129).waveform));
    }

    #[test]
    fn short_inputs_skip_their_layers() {
        let mut vis = AbstractFlow::new(settings());
        let degenerate = FeatureSnapshot {
            rms: 0.3,
            spectrum: vec![1.0],
            waveform: vec![0.5],
            bands: Bands::default(),
        };
        let frame = vis.render_frame(&degenerate);
        assert!(vis.history.is_empty());
        assert_eq!(vis.frame_index(), 1);
        // bottom-left corner is where the first bar would be
        assert_eq!(*frame.get_pixel(4, 239), settings().theme.background);
    }

    #[test]
    fn bars_have_minimum_height() {
        let mut vis = AbstractFlow::new(settings());
        let silent_spectrum = FeatureSnapshot {
            spectrum: vec![0.0; 1025],
            ..Default::default()
        };
        let frame = vis.render_frame(&silent_spectrum);
        let theme = settings().theme;
        // bar 0 spans x 2..=8, five pixels tall from the bottom
        let low = theme.color(Band::Low, 0.0);
        assert_eq!(*frame.get_pixel(4, 239), low);
        assert_eq!(*frame.get_pixel(4, 235), low);
        assert_eq!(*frame.get_pixel(4, 234), theme.background);
        // last bar uses the high band color
        assert_eq!(*frame.get_pixel(31 * 10 + 4, 239), theme.color(Band::High, 0.0));
    }

    #[test]
    fn bars_are_capped_below_top() {
        let mut vis = AbstractFlow::new(settings());
        let huge = FeatureSnapshot {
            spectrum: vec![1.0e6; 1025],
            ..Default::default()
        };
        let frame = vis.render_frame(&huge);
        // 90% of 240 is 216, so rows above 24 stay background
        assert_eq!(*frame.get_pixel(4, 24), vis.settings.theme.color(Band::Low, 0.0));
        assert_eq!(*frame.get_pixel(4, 23), vis.settings.theme.background);
    }

    #[test]
    fn narrow_frames_skip_bars() {
        let narrow = RenderSettings {
            width: 40,
            height: 48,
            ..settings()
        };
        let mut vis = AbstractFlow::new(narrow);
        let frame = vis.render_frame(&FeatureSnapshot {
            spectrum: vec![100.0; 1025],
            ..Default::default()
        });
        // bars are the only layer painted in the low band color
        let bar_color = narrow.theme.color(Band::Low, 0.0);
        assert!(frame.pixels().all(|&p| p != bar_color));

        let mut wide = AbstractFlow::new(settings());
        let frame = wide.render_frame(&FeatureSnapshot {
            spectrum: vec![100.0; 1025],
            ..Default::default()
        });
        assert!(frame.pixels().any(|&p| p == bar_color));
    }

    #[test]
    fn inner_disk_grows_with_high_band() {
        let mut vis = AbstractFlow::new(settings());
        let bright = FeatureSnapshot {
            bands: Bands::new(0.0, 0.0, 1.0),
            ..Default::default()
        };
        let frame = vis.render_frame(&bright);
        let color = vis.settings.theme.color(Band::High, 1.0);
        // radius 70 around (160, 120)
        assert_eq!(*frame.get_pixel(160, 120), color);
        assert_eq!(*frame.get_pixel(160 + 45, 120), color);
    }

    #[test]
    fn frames_are_not_idempotent() {
        let mut vis = AbstractFlow::new(settings());
        let snap = snapshot(0);
        let first = vis.render_frame(&snap);
        let second = vis.render_frame(&snap);
        assert_ne!(first, second);
    }
}
