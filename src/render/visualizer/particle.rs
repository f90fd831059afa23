use std::f32::consts::PI;

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{RenderSettings, Visualizer};
use crate::audio::features::FeatureSnapshot;
use crate::render::canvas::{Canvas, Paint};
use crate::render::theme::{scale, Band};

/// Upper bound on live particles.
pub const MAX_PARTICLES: usize = 200;

const SPAWN_SPREAD: f32 = 50.0;
const DAMPING: f32 = 0.98;
const LIFE_DECAY: f32 = 0.02;

#[derive(Clone, Debug)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub color: Rgb<u8>,
    pub size: f32,
    /// 1.0 at spawn, removed once it reaches 0
    pub life: f32,
}

/// Particles bursting from the center, spawned by loudness and pushed by
/// the mid band.
pub struct ParticleField {
    settings: RenderSettings,
    particles: Vec<Particle>,
    rng: StdRng,
    frame_index: u64,
}

impl ParticleField {
    pub fn new(settings: RenderSettings, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            settings,
            particles: Vec::with_capacity(MAX_PARTICLES),
            rng,
            frame_index: 0,
        }
    }

    fn spawn(&mut self, snapshot: &FeatureSnapshot) {
        let rms = snapshot.rms;
        let bands = snapshot.bands;
        let num_to_spawn = (rms * 10.0) as usize + 2;
        let (cx, cy) = self.settings.center();
        let speed = (bands.mid + 0.2) * 5.0;
        let max_size = 6 + (rms * 6.0).round() as u32;

        for _ in 0..num_to_spawn {
            if self.particles.len() >= MAX_PARTICLES {
                break;
            }

            let band = Band::ALL[self.rng.gen_range(0..Band::ALL.len())];
            let level = match band {
                Band::Low => bands.low,
                Band::Mid => bands.mid,
                Band::High => bands.high,
            };
            let color = self.settings.theme.color(band, level);

            let angle = self.rng.gen_range(0.0..2.0 * PI);
            let size = self.rng.gen_range(2..=max_size) as f32;
            let x = cx + self.rng.gen_range(-SPAWN_SPREAD..=SPAWN_SPREAD);
            let y = cy + self.rng.gen_range(-SPAWN_SPREAD..=SPAWN_SPREAD);

            self.particles.push(Particle {
                x,
                y,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                color,
                size,
                life: 1.0,
            });
        }
    }

    fn update(&mut self) {
        for p in &mut self.particles {
            p.x += p.vx;
            p.y += p.vy;
            p.life -= LIFE_DECAY;
            p.vx *= DAMPING;
            p.vy *= DAMPING;
        }
        self.particles.retain(|p| p.life > 0.0);
    }

    fn draw(&self, canvas: &mut Canvas) {
        // Insertion order, oldest first
        for p in &self.particles {
            let size = ((p.size * p.life) as i32).max(1) as f32;
            let (x, y) = (p.x.trunc(), p.y.trunc());
            canvas.draw_ellipse(x, y, size, size, scale(p.color, p.life), Paint::Filled);
        }
    }
}

impl Visualizer for ParticleField {
    fn render_frame(&mut self, snapshot: &FeatureSnapshot) -> RgbImage {
        let mut canvas = self.settings.blank_canvas();

        self.spawn(snapshot);
        self.update();
        self.draw(&mut canvas);

        log::debug!("frame {}: {} particles", self.frame_index, self.particles.len());
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
            theme: Theme::get(ThemeName::Cosmic),
        }
    }

    fn loud() -> FeatureSnapshot {
        FeatureSnapshot {
            rms: 1.0,
            bands: Bands::new(1.0, 1.0, 1.0),
            ..Default::default()
        }
    }

    #[test]
    fn count_never_exceeds_capacity() {
        let mut field = ParticleField::new(settings(), Some(1));
        for _ in 0..120 {
            field.render_frame(&loud());
            assert!(field.particles.len() <= MAX_PARTICLES);
        }
        // at most one spawn batch can expire in a single frame
        assert!(field.particles.len() >= MAX_PARTICLES - 12);
    }

    #[test]
    fn silence_settles_at_steady_state() {
        let mut field = ParticleField::new(settings(), Some(2));
        let silent = FeatureSnapshot::default();
        for _ in 0..100 {
            field.render_frame(&silent);
        }
        // two spawns per frame against a ~50 frame lifetime
        let steady = field.particles.len();
        assert!((96..=102).contains(&steady), "steady state {}", steady);
        for _ in 0..20 {
            field.render_frame(&silent);
            assert_eq!(field.particles.len(), steady);
        }
    }

    #[test]
    fn loud_burst_decays_back_to_steady_state() {
        let mut field = ParticleField::new(settings(), Some(3));
        for _ in 0..30 {
            field.render_frame(&loud());
        }
        let peak = field.particles.len();
        let silent = FeatureSnapshot::default();
        for _ in 0..100 {
            field.render_frame(&silent);
        }
        assert!(field.particles.len() < peak);
        assert!(field.particles.len() <= 102);
    }

    #[test]
    fn particles_age_and_slow_down() {
        let mut field = ParticleField::new(settings(), Some(4));
        field.render_frame(&loud());
        let before: Vec<Particle> = field.particles.clone();
        assert!(before.iter().all(|p| (p.life - 0.98).abs() < 1e-6));

        field.update();
        for (old, new) in before.iter().zip(field.particles.iter()) {
            assert!((new.life - (old.life - LIFE_DECAY)).abs() < 1e-6);
            assert!((new.x - (old.x + old.vx)).abs() < 1e-4);
            assert!((new.vx - old.vx * DAMPING).abs() < 1e-6);
        }
    }

    #[test]
    fn spawned_particles_start_near_center() {
        let mut field = ParticleField::new(settings(), Some(5));
        field.spawn(&loud());
        assert_eq!(field.particles.len(), 12);
        for p in &field.particles {
            assert!((p.x - 160.0).abs() <= SPAWN_SPREAD);
            assert!((p.y - 120.0).abs() <= SPAWN_SPREAD);
            assert!((2.0..=12.0).contains(&p.size));
            assert!(((p.vx * p.vx + p.vy * p.vy).sqrt() - 6.0).abs() < 1e-4);
            assert_eq!(p.life, 1.0);
        }
    }

    #[test]
    fn rendering_twice_differs() {
        let mut field = ParticleField::new(settings(), Some(6));
        let snapshot = loud();
        let first = field.render_frame(&snapshot);
        let second = field.render_frame(&snapshot);
        assert_ne!(first, second);
    }

    #[test]
    fn same_seed_same_frames() {
        let mut a = ParticleField::new(settings(), Some(42));
        let mut b = ParticleField::new(settings(), Some(42));
        for _ in 0..5 {
            assert_eq!(a.render_frame(&loud()), b.render_frame(&loud()));
        }
    }
}
