use anyhow::{Context, Result};
use image::RgbImage;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crate::audio::decode::SampleBuffer;
use crate::error::VizError;

static NEXT_AUDIO_ID: AtomicUsize = AtomicUsize::new(0);

/// Video settings handed to ffmpeg.
#[derive(Clone, Debug)]
pub struct EncoderOptions {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
    pub bitrate: Option<String>,
}

/// Pipes raw RGB frames into an ffmpeg child process and muxes them with
/// the run's audio, written to a temporary WAV first.
///
/// Dropping the encoder without `finish` kills the child. Either way the
/// temporary WAV is removed.
pub struct FfmpegEncoder {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    audio_path: PathBuf,
    frames_written: usize,
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, audio: &SampleBuffer, opts: &EncoderOptions) -> Result<Self> {
        Self::with_command(Command::new("ffmpeg"), output_path, audio, opts)
    }

    /// Start the encoder through `command`, which receives the ffmpeg
    /// arguments appended to whatever it already carries.
    fn with_command(
        mut command: Command,
        output_path: &Path,
        audio: &SampleBuffer,
        opts: &EncoderOptions,
    ) -> Result<Self> {
        let audio_path = std::env::temp_dir().join(format!(
            "muviz-{}-{}.wav",
            std::process::id(),
            NEXT_AUDIO_ID.fetch_add(1, Ordering::Relaxed)
        ));
        write_wav(&audio_path, audio)?;

        let args = build_args(output_path, &audio_path, opts);

        let mut child = match command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                let _ = std::fs::remove_file(&audio_path);
                return Err(VizError::encoding(format!(
                    "failed to spawn ffmpeg ({}). Is ffmpeg installed?",
                    e
                ))
                .into());
            }
        };

        // Drain stderr continuously so a chatty ffmpeg never blocks on it
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            opts.width,
            opts.height,
            opts.fps,
            opts.codec
        );

        Ok(Self {
            stdin: child.stdin.take(),
            child: Some(child),
            stderr,
            audio_path,
            frames_written: 0,
        })
    }

    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| VizError::encoding("ffmpeg stdin not available"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| VizError::encoding(format!("failed to write frame to ffmpeg: {}", e)))?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.stdin.take());

        let mut child = self
            .child
            .take()
            .ok_or_else(|| VizError::encoding("ffmpeg already finished"))?;
        let status = child.wait().context("Failed to wait for ffmpeg")?;
        let stderr = self.collect_stderr();

        if !status.success() {
            return Err(VizError::encoding(format!("ffmpeg exited with error:\n{}", stderr)).into());
        }

        log::info!("FFmpeg encoding complete ({} frames)", self.frames_written);
        Ok(())
    }

    fn collect_stderr(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                log::warn!("Stopping unfinished ffmpeg after {} frames", self.frames_written);
                let _ = child.kill();
            }
            let _ = child.wait();
        }
        self.collect_stderr();
        let _ = std::fs::remove_file(&self.audio_path);
    }
}

fn build_args(output_path: &Path, audio_path: &Path, opts: &EncoderOptions) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".into(),
        "-nostats".into(),
        "-loglevel".into(), "error".into(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgb24".into(),
        "-video_size".into(), format!("{}x{}", opts.width, opts.height),
        "-framerate".into(), opts.fps.to_string(),
        "-i".into(), "pipe:0".into(),
        "-i".into(), audio_path.to_string_lossy().into_owned(),
        "-c:v".into(), opts.codec.clone(),
        "-pix_fmt".into(), opts.pix_fmt.clone(),
    ];

    if let Some(ref br) = opts.bitrate {
        args.extend(["-b:v".to_string(), br.clone()]);
    } else {
        args.extend(["-crf".to_string(), opts.crf.to_string()]);
        args.extend(["-preset".to_string(), "medium".to_string()]);
    }

    args.extend([
        "-c:a".into(), "aac".into(),
        "-b:a".into(), "192k".into(),
        "-shortest".into(),
        output_path.to_string_lossy().into_owned(),
    ]);

    args
}

/// Write mono float samples as a 32-bit float WAV.
pub fn write_wav(path: &Path, audio: &SampleBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
    for &s in &audio.samples {
        writer.write_sample(s).context("Failed to write audio sample")?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}
