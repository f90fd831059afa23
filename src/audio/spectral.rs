use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Windowed forward transform used by the feature extractor and the batch
/// analyses. Implementations must be shareable across rayon workers.
pub trait SpectralTransform: Send + Sync {
    /// Transform length; inputs are expected to be exactly this long.
    fn size(&self) -> usize;

    /// Magnitudes of the non-negative frequency half (`size()/2 + 1` bins)
    /// of the windowed real input.
    fn magnitudes(&self, frame: &[f32]) -> Vec<f32>;
}

/// Hann window + complex FFT from rustfft, keeping the real-input half.
pub struct RustFftTransform {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl RustFftTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        Self {
            fft,
            window: hann_window(size),
        }
    }
}

impl SpectralTransform for RustFftTransform {
    fn size(&self) -> usize {
        self.window.len()
    }

    fn magnitudes(&self, frame: &[f32]) -> Vec<f32> {
        let size = self.size();
        if size == 0 {
            return Vec::new();
        }

        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); size];
        for (i, (&s, &w)) in frame.iter().zip(self.window.iter()).enumerate() {
            buffer[i] = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut buffer);

        buffer[..size / 2 + 1].iter().map(|c| c.norm()).collect()
    }
}

/// Symmetric Hann window.
pub fn hann_window(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
