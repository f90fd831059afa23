pub mod ffmpeg;
pub mod png;
