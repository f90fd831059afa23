/// Parameters of the spectral analysis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtractionParams {
    pub sample_rate: u32,
    /// Hop between STFT frames for the batch analyses (mel, onsets).
    pub hop_length: usize,
    pub fft_size: usize,
    /// Length of the per-frame waveform snippet.
    pub waveform_samples: usize,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            hop_length: 512,
            fft_size: 2048,
            waveform_samples: 1024,
        }
    }
}

impl ExtractionParams {
    /// Number of spectrum bins, `fft_size / 2 + 1`.
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}

/// Coarse energies of the lower, middle and upper third of the spectrum,
/// scaled so the loudest band is 1.0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bands {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

impl Bands {
    pub fn new(low: f32, mid: f32, high: f32) -> Self {
        Self { low, mid, high }
    }
}

/// Everything a visualizer needs for one frame.
#[derive(Clone, Debug, Default)]
pub struct FeatureSnapshot {
    /// Loudness proxy in [0, 1]
    pub rms: f32,
    /// Magnitude spectrum, `fft_size / 2 + 1` bins
    pub spectrum: Vec<f32>,
    /// Raw samples starting at the frame position
    pub waveform: Vec<f32>,
    pub bands: Bands,
}
