/// Fatal conditions of a visualization run.
///
/// Numeric edge cases (silence, frames past the end of the audio, expired
/// particles) never show up here: the extractor and the visualizers fall
/// back to zero values or skip drawing instead.
#[derive(Debug, thiserror::Error)]
pub enum VizError {
    /// The requested duration yields no frames at the configured fps.
    #[error("nothing to render: {duration:.3}s at {fps}fps yields zero frames")]
    EmptyFrameSequence { duration: f64, fps: u32 },
    /// The external encoder is missing or failed while writing.
    #[error("video encoding failed: {0}")]
    Encoding(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VizError {
    pub fn encoding<T: Into<String>>(msg: T) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn invalid_config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
