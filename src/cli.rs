use clap::Parser;
use std::path::PathBuf;

use crate::render::theme::ThemeName;
use crate::render::visualizer::Style;

#[derive(Parser, Debug)]
#[command(name = "muviz", about = "Render audio-reactive visualization videos")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Output video file [default: input path with .mp4 extension]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Visualization style
    #[arg(short, long, value_enum, default_value_t = Style::Geometric)]
    pub style: Style,

    /// Color theme
    #[arg(short, long, value_enum, default_value_t = ThemeName::Cosmic)]
    pub theme: ThemeName,

    /// Video width in pixels
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Video height in pixels
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Only render the first N seconds (0 for the full audio)
    #[arg(short, long, default_value_t = 0.0)]
    pub duration: f64,

    /// Config file [default: ./muviz.toml or ~/.config/muviz/config.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seed for the particle style; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Peak-normalize the audio before analysis
    #[arg(long)]
    pub normalize: bool,

    /// Fade in/out length in seconds applied before analysis
    #[arg(long)]
    pub fade: Option<f32>,

    /// Run the onset and mel analyses and log a summary
    #[arg(long)]
    pub analyze: bool,

    /// Also write every frame as PNG into this directory
    #[arg(long)]
    pub frames_dir: Option<PathBuf>,

    /// Skip video encoding (useful with --frames-dir)
    #[arg(long)]
    pub no_video: bool,

    /// H.264 CRF quality (0-51, lower = better). Ignored when --bitrate is set.
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// Video bitrate (e.g. 2400k, 5M). When set, uses -b:v instead of -crf.
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,
}

impl Cli {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("mp4"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["muviz", "song.mp3"]).unwrap();
        assert_eq!(cli.style, Style::Geometric);
        assert_eq!(cli.theme, ThemeName::Cosmic);
        assert_eq!((cli.width, cli.height, cli.fps), (1920, 1080, 30));
        assert_eq!(cli.output_path(), PathBuf::from("song.mp4"));
    }

    #[test]
    fn style_and_theme_flags() {
        let cli = Cli::try_parse_from([
            "muviz", "in.wav", "-s", "abstract", "-t", "pastel", "-o", "x.mkv", "--seed", "3",
        ])
        .unwrap();
        assert_eq!(cli.style, Style::Abstract);
        assert_eq!(cli.theme, ThemeName::Pastel);
        assert_eq!(cli.output_path(), PathBuf::from("x.mkv"));
        assert_eq!(cli.seed, Some(3));
    }

    #[test]
    fn rejects_unknown_style() {
        assert!(Cli::try_parse_from(["muviz", "in.wav", "--style", "cubist"]).is_err());
    }
}
