pub mod abstract_art;
pub mod geometric;
pub mod particle;

use clap::ValueEnum;
use image::RgbImage;
use serde::Deserialize;

use crate::audio::features::FeatureSnapshot;
use crate::render::canvas::Canvas;
use crate::render::theme::Theme;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Geometric,
    Particle,
    Abstract,
}

/// Frame geometry and palette, copied into every visualizer.
#[derive(Clone, Copy, Debug)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub theme: Theme,
}

impl RenderSettings {
    pub fn blank_canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height, self.theme.background)
    }

    /// Integer center of the frame.
    pub fn center(&self) -> (f32, f32) {
        ((self.width / 2) as f32, (self.height / 2) as f32)
    }
}

/// A stateful renderer turning one feature snapshot into one frame.
///
/// Calls are order-dependent: each one advances rotation phase, history or
/// particles, so rendering the same snapshot twice gives different frames.
pub trait Visualizer: Send {
    fn render_frame(&mut self, snapshot: &FeatureSnapshot) -> RgbImage;

    /// Number of frames rendered so far.
    fn frame_index(&self) -> u64;
}

/// Build a fresh visualizer. `seed` only matters for the particle style.
pub fn create(style: Style, settings: RenderSettings, seed: Option<u64>) -> Box<dyn Visualizer> {
    match style {
        Style::Geometric => Box::new(geometric::Geometric::new(settings)),
        Style::Particle => Box::new(particle::ParticleField::new(settings, seed)),
        Style::Abstract => Box::new(abstract_art::AbstractFlow::new(settings)),
    }
}
