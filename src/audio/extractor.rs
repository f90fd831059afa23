use super::decode::SampleBuffer;
use super::features::{Bands, ExtractionParams, FeatureSnapshot};
use super::spectral::{RustFftTransform, SpectralTransform};

/// Turns a sample buffer and a video frame index into feature values.
///
/// Every query succeeds. Without audio, or for frames past the end of the
/// buffer, the result is silence: zero spectrum, zero waveform, zero RMS.
/// Queries are pure, so one extractor can be shared across threads.
pub struct FeatureExtractor<'a> {
    audio: Option<&'a SampleBuffer>,
    params: ExtractionParams,
    transform: Box<dyn SpectralTransform>,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(audio: Option<&'a SampleBuffer>, params: ExtractionParams) -> Self {
        let transform = Box::new(RustFftTransform::new(params.fft_size));
        Self::with_transform(audio, params, transform)
    }

    pub fn with_transform(
        audio: Option<&'a SampleBuffer>,
        params: ExtractionParams,
        transform: Box<dyn SpectralTransform>,
    ) -> Self {
        Self {
            audio,
            params,
            transform,
        }
    }

    /// Frames are timed against the buffer's own rate, falling back to the
    /// configured one without audio.
    fn samples_per_frame(&self, fps: u32) -> f64 {
        let rate = self.audio.map_or(self.params.sample_rate, |a| a.sample_rate);
        rate as f64 / fps as f64
    }

    /// First sample of the frame, or `None` when there is nothing to read.
    fn frame_start(&self, frame_idx: usize, fps: u32) -> Option<(&'a [f32], usize)> {
        let audio = self.audio?;
        if fps == 0 || audio.sample_rate == 0 {
            return None;
        }
        let start = (frame_idx as f64 * self.samples_per_frame(fps)).floor() as usize;
        if start >= audio.len() {
            return None;
        }
        Some((audio.samples.as_slice(), start))
    }

    /// Samples covered by one video frame, clipped to the buffer.
    fn frame_samples(&self, frame_idx: usize, fps: u32) -> Option<&'a [f32]> {
        let (samples, start) = self.frame_start(frame_idx, fps)?;
        let span = self.samples_per_frame(fps).floor() as usize;
        let end = (start + span).min(samples.len());
        Some(&samples[start..end])
    }

    /// Magnitude spectrum of the frame, `fft_size / 2 + 1` bins.
    pub fn spectrum(&self, frame_idx: usize, fps: u32) -> Vec<f32> {
        let Some(frame) = self.frame_samples(frame_idx, fps) else {
            return vec![0.0; self.params.num_bins()];
        };

        let fft_size = self.params.fft_size;
        let mut padded = vec![0.0f32; fft_size];
        let n = frame.len().min(fft_size);
        padded[..n].copy_from_slice(&frame[..n]);

        self.transform.magnitudes(&padded)
    }

    /// `num_samples` raw samples starting at the frame position, zero-padded
    /// past the end of the buffer.
    pub fn waveform(&self, frame_idx: usize, fps: u32, num_samples: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; num_samples];
        if let Some((samples, start)) = self.frame_start(frame_idx, fps) {
            let end = (start + num_samples).min(samples.len());
            out[..end - start].copy_from_slice(&samples[start..end]);
        }
        out
    }

    /// RMS of the frame scaled by 5 and clamped to [0, 1].
    pub fn rms_energy(&self, frame_idx: usize, fps: u32) -> f32 {
        match self.frame_samples(frame_idx, fps) {
            Some(frame) if !frame.is_empty() => {
                let rms = (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt();
                (rms * 5.0).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Mean magnitude of each spectrum third, normalized by the largest.
    pub fn frequency_bands(&self, frame_idx: usize, fps: u32) -> Bands {
        bands_from_spectrum(&self.spectrum(frame_idx, fps))
    }

    /// All features of one frame.
    pub fn snapshot(&self, frame_idx: usize, fps: u32) -> FeatureSnapshot {
        let spectrum = self.spectrum(frame_idx, fps);
        let bands = bands_from_spectrum(&spectrum);
        FeatureSnapshot {
            rms: self.rms_energy(frame_idx, fps),
            waveform: self.waveform(frame_idx, fps, self.params.waveform_samples),
            spectrum,
            bands,
        }
    }
}

/// Split into thirds by index and normalize so the loudest band is 1.0.
pub fn bands_from_spectrum(spectrum: &[f32]) -> Bands {
    let n = spectrum.len();
    if n == 0 {
        return Bands::default();
    }

    let low_end = n / 3;
    let mid_end = 2 * n / 3;

    let mean = |slice: &[f32]| -> f32 {
        if slice.is_empty() {
            0.0
        } else {
            slice.iter().sum::<f32>() / slice.len() as f32
        }
    };

    let low = mean(&spectrum[..low_end]);
    let mid = mean(&spectrum[low_end..mid_end]);
    let high = mean(&spectrum[mid_end..]);

    let max_val = low.max(mid).max(high).max(1e-10);
    Bands::new(low / max_val, mid / max_val, high / max_val)
}
