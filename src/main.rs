mod cli;
mod config;
mod audio;
mod render;
mod encode;
mod error;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use audio::extractor::FeatureExtractor;
use cli::Cli;
use config::Settings;
use encode::ffmpeg::{EncoderOptions, FfmpegEncoder};
use encode::png::PngFrameWriter;
use render::sequencer::FrameSequencer;
use render::theme::Theme;
use render::visualizer::{self, RenderSettings};

const MEL_BANDS: usize = 128;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config_path = config::discover_config(cli.config.as_deref());
    let file_config = config_path.as_ref().and_then(|path| {
        let cfg = config::load_config(path);
        if cfg.is_some() {
            log::info!("Loaded config from {}", path.display());
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
        cfg
    });
    let settings = Settings::resolve(&cli, file_config);
    settings.validate()?;

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }
    if cli.no_video && cli.frames_dir.is_none() {
        log::warn!("--no-video without --frames-dir renders frames nowhere");
    }

    let output = cli.output_path();
    log::info!("muviz - audio visualizer");
    log::info!("Input: {}", cli.input.display());
    if !cli.no_video {
        log::info!("Output: {}", output.display());
    }
    log::info!("Style: {:?}, theme: {:?}", settings.style, settings.theme);
    log::info!("Resolution: {}x{} @ {}fps", settings.width, settings.height, settings.fps);

    // 1. Decode audio
    log::info!("Decoding audio...");
    let max_duration = (cli.duration > 0.0).then_some(cli.duration);
    let mut audio_data =
        audio::decode::decode_audio(&cli.input, settings.extraction.sample_rate, max_duration)?;
    log::info!(
        "Decoded {} samples @ {} Hz ({:.2}s)",
        audio_data.len(),
        audio_data.sample_rate,
        audio_data.duration()
    );

    // 2. Preprocess
    if cli.normalize {
        audio::processor::normalize(&mut audio_data.samples);
    }
    if let Some(fade) = cli.fade {
        audio::processor::apply_fade(&mut audio_data.samples, audio_data.sample_rate, fade);
    }

    // 3. Optional batch analyses
    if cli.analyze {
        log::info!("Analyzing audio...");
        let beats = audio::analysis::beat_positions(Some(&audio_data), &settings.extraction, settings.fps);
        log::info!(
            "Beats: {} onsets on {} frames, tempo {:.1} BPM",
            beats.onset_times.len(),
            beats.frames.len(),
            beats.tempo_bpm
        );
        let mel = audio::analysis::mel_spectrogram(Some(&audio_data), &settings.extraction, MEL_BANDS);
        let columns = mel.first().map_or(0, Vec::len);
        log::info!("Mel spectrogram: {} bands x {} frames", mel.len(), columns);
    }

    // 4. Build the frame pipeline
    let extractor = FeatureExtractor::new(Some(&audio_data), settings.extraction);
    let render_settings = RenderSettings {
        width: settings.width,
        height: settings.height,
        theme: Theme::get(settings.theme),
    };
    let visualizer = visualizer::create(settings.style, render_settings, settings.seed);
    let sequencer = FrameSequencer::new(&extractor, visualizer, audio_data.duration(), settings.fps)?;
    let total_frames = sequencer.num_frames();
    log::info!("Total frames: {}, Duration: {:.1}s", total_frames, audio_data.duration());

    // 5. Outputs
    let mut encoder = if cli.no_video {
        None
    } else {
        log::info!("Starting FFmpeg encoder...");
        let opts = EncoderOptions {
            width: settings.width,
            height: settings.height,
            fps: settings.fps,
            codec: settings.codec.clone(),
            pix_fmt: cli.pix_fmt.clone(),
            crf: settings.crf,
            bitrate: cli.bitrate.clone(),
        };
        Some(FfmpegEncoder::new(&output, &audio_data, &opts)?)
    };
    let mut png_writer = cli.frames_dir.as_deref().map(PngFrameWriter::new).transpose()?;

    // 6. Render loop
    let pb = ProgressBar::new(total_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    for (frame_idx, frame) in sequencer.enumerate() {
        if let Some(ref mut enc) = encoder {
            enc.write_frame(&frame)?;
        }
        if let Some(ref mut writer) = png_writer {
            writer.write_frame(&frame)?;
        }
        pb.set_position(frame_idx as u64 + 1);
    }

    pb.finish_with_message("Rendering complete");

    // 7. Finish encoding
    if let Some(enc) = encoder {
        log::info!("Finishing encoding...");
        enc.finish()?;
        log::info!("Done! Output: {}", output.display());
    }
    if let Some(dir) = cli.frames_dir.as_ref() {
        log::info!("Frames written to {}", dir.display());
    }
    Ok(())
}
