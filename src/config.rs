use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::features::ExtractionParams;
use crate::cli::Cli;
use crate::error::VizError;
use crate::render::theme::ThemeName;
use crate::render::visualizer::Style;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub visual: VisualConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_waveform_samples")]
    pub waveform_samples: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct VisualConfig {
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub theme: ThemeName,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            hop_length: default_hop_length(),
            fft_size: default_fft_size(),
            waveform_samples: default_waveform_samples(),
        }
    }
}

fn default_width() -> u32 { 1920 }
fn default_height() -> u32 { 1080 }
fn default_fps() -> u32 { 30 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_sample_rate() -> u32 { 22050 }
fn default_hop_length() -> usize { 512 }
fn default_fft_size() -> usize { 2048 }
fn default_waveform_samples() -> usize { 1024 }

/// Effective run settings after merging the CLI with the config file.
#[derive(Clone, Debug)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub style: Style,
    pub theme: ThemeName,
    pub seed: Option<u64>,
    pub crf: u32,
    pub codec: String,
    pub extraction: ExtractionParams,
}

impl Settings {
    /// Config values apply only where the CLI is still at its default.
    pub fn resolve(cli: &Cli, config: Option<Config>) -> Self {
        let cfg = config.unwrap_or_default();
        Self {
            width: if cli.width == default_width() { cfg.output.width } else { cli.width },
            height: if cli.height == default_height() { cfg.output.height } else { cli.height },
            fps: if cli.fps == default_fps() { cfg.output.fps } else { cli.fps },
            style: if cli.style == Style::default() { cfg.visual.style } else { cli.style },
            theme: if cli.theme == ThemeName::default() { cfg.visual.theme } else { cli.theme },
            seed: cli.seed.or(cfg.visual.seed),
            crf: if cli.crf == default_crf() { cfg.output.crf } else { cli.crf },
            codec: if cli.codec == default_codec() { cfg.output.codec } else { cli.codec.clone() },
            extraction: ExtractionParams {
                sample_rate: cfg.audio.sample_rate,
                hop_length: cfg.audio.hop_length,
                fft_size: cfg.audio.fft_size,
                waveform_samples: cfg.audio.waveform_samples,
            },
        }
    }

    pub fn validate(&self) -> Result<(), VizError> {
        if self.width == 0 || self.height == 0 {
            return Err(VizError::invalid_config(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(VizError::invalid_config("fps must be positive"));
        }
        if self.extraction.sample_rate == 0 {
            return Err(VizError::invalid_config("sample_rate must be positive"));
        }
        if self.extraction.fft_size < 2 {
            return Err(VizError::invalid_config(format!(
                "fft_size must be at least 2, got {}",
                self.extraction.fft_size
            )));
        }
        if self.extraction.hop_length == 0 {
            return Err(VizError::invalid_config("hop_length must be positive"));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Invalid config {}: {}", path.display(), e);
            None
        }
    }
}

/// Explicit path, then `./muviz.toml`, then the user config directories.
pub fn discover_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("muviz.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("muviz").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("muviz").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
