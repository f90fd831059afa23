use clap::ValueEnum;
use image::Rgb;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Cosmic,
    Neon,
    Pastel,
}

/// One of the three frequency bands, used to pick a palette color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band {
    Low,
    Mid,
    High,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Low, Band::Mid, Band::High];
}

/// Background plus one color per band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    pub background: Rgb<u8>,
    pub low: Rgb<u8>,
    pub mid: Rgb<u8>,
    pub high: Rgb<u8>,
}

const COSMIC: Theme = Theme {
    background: Rgb([10, 10, 30]),
    low: Rgb([255, 100, 50]),
    mid: Rgb([150, 50, 200]),
    high: Rgb([50, 150, 255]),
};

const NEON: Theme = Theme {
    background: Rgb([0, 0, 0]),
    low: Rgb([255, 0, 128]),
    mid: Rgb([0, 255, 128]),
    high: Rgb([0, 128, 255]),
};

const PASTEL: Theme = Theme {
    background: Rgb([250, 245, 240]),
    low: Rgb([255, 182, 193]),
    mid: Rgb([173, 216, 230]),
    high: Rgb([144, 238, 144]),
};

impl Theme {
    pub fn get(name: ThemeName) -> Theme {
        match name {
            ThemeName::Cosmic => COSMIC,
            ThemeName::Neon => NEON,
            ThemeName::Pastel => PASTEL,
        }
    }

    pub fn base(&self, band: Band) -> Rgb<u8> {
        match band {
            Band::Low => self.low,
            Band::Mid => self.mid,
            Band::High => self.high,
        }
    }

    /// Band color dimmed to 30% at zero intensity, full at 1.0.
    pub fn color(&self, band: Band, intensity: f32) -> Rgb<u8> {
        scale(self.base(band), 0.3 + 0.7 * intensity)
    }
}

/// Multiply every channel by `factor`, truncating.
pub fn scale(color: Rgb<u8>, factor: f32) -> Rgb<u8> {
    let Rgb([r, g, b]) = color;
    let ch = |c: u8| (c as f32 * factor).clamp(0.0, 255.0) as u8;
    Rgb([ch(r), ch(g), ch(b)])
}
