//! Whole-buffer analyses that run once before rendering. Nothing in the
//! per-frame path depends on them; `--analyze` logs their results.

use rayon::prelude::*;

use super::decode::SampleBuffer;
use super::features::ExtractionParams;
use super::spectral::{RustFftTransform, SpectralTransform};

/// Onsets found by spectral flux peak picking.
#[derive(Clone, Debug, Default)]
pub struct BeatAnalysis {
    /// Onset times in seconds, ascending
    pub onset_times: Vec<f32>,
    /// Unique ascending video frame indices containing an onset
    pub frames: Vec<usize>,
    pub tempo_bpm: f32,
}

/// Mel-band power in dB relative to the loudest cell, `n_mels` rows by STFT
/// frames. Without audio the result is an `n_mels x 1` matrix of zeros.
pub fn mel_spectrogram(audio: Option<&SampleBuffer>, params: &ExtractionParams, n_mels: usize) -> Vec<Vec<f32>> {
    let n_fft = params.fft_size;
    let hop = params.hop_length.max(1);
    let audio = match audio {
        Some(a) if !a.is_empty() && n_fft >= 2 => a,
        _ => return vec![vec![0.0; 1]; n_mels],
    };

    // Centered frames: pad half a window on both sides
    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; audio.len() + 2 * pad];
    padded[pad..pad + audio.len()].copy_from_slice(&audio.samples);
    let num_frames = 1 + (padded.len() - n_fft) / hop;

    let transform = RustFftTransform::new(n_fft);
    let power: Vec<Vec<f32>> = (0..num_frames)
        .into_par_iter()
        .map(|t| {
            let start = t * hop;
            transform
                .magnitudes(&padded[start..start + n_fft])
                .into_iter()
                .map(|m| m * m)
                .collect()
        })
        .collect();

    let filters = mel_filterbank(params.sample_rate, n_fft, n_mels);
    let mut mel: Vec<Vec<f32>> = filters
        .iter()
        .map(|weights| {
            power
                .iter()
                .map(|frame| weights.iter().zip(frame.iter()).map(|(w, p)| w * p).sum())
                .collect()
        })
        .collect();

    power_to_db(&mut mel, 80.0);
    mel
}

/// Triangular filters on the HTK mel scale, area-normalized.
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let hz_to_mel = |hz: f32| 2595.0 * (1.0 + hz / 700.0).log10();
    let mel_to_hz = |mel: f32| 700.0 * (10f32.powf(mel / 2595.0) - 1.0);

    let num_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f32 / 2.0;
    let max_mel = hz_to_mel(nyquist);
    let edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f32 / (n_mels + 1) as f32))
        .collect();
    let bin_hz = |k: usize| k as f32 * sample_rate as f32 / n_fft as f32;

    (0..n_mels)
        .map(|m| {
            let (lo, center, hi) = (edges[m], edges[m + 1], edges[m + 2]);
            let norm = 2.0 / (hi - lo).max(f32::EPSILON);
            (0..num_bins)
                .map(|k| {
                    let f = bin_hz(k);
                    let rising = (f - lo) / (center - lo).max(f32::EPSILON);
                    let falling = (hi - f) / (hi - center).max(f32::EPSILON);
                    rising.min(falling).max(0.0) * norm
                })
                .collect()
        })
        .collect()
}

fn power_to_db(matrix: &mut [Vec<f32>], top_db: f32) {
    let reference = matrix
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(0.0f32, f32::max)
        .max(1e-10);
    let ref_db = 10.0 * reference.log10();
    for row in matrix.iter_mut() {
        for value in row.iter_mut() {
            *value = 10.0 * value.max(1e-10).log10() - ref_db;
        }
    }
    let floor = matrix
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max)
        - top_db;
    for row in matrix.iter_mut() {
        for value in row.iter_mut() {
            *value = value.max(floor);
        }
    }
}

/// Onset detection over hop-spaced windows, mapped onto video frames.
pub fn beat_positions(audio: Option<&SampleBuffer>, params: &ExtractionParams, fps: u32) -> BeatAnalysis {
    let audio = match audio {
        Some(a) if !a.is_empty() && params.fft_size >= 2 && a.sample_rate > 0 => a,
        _ => return BeatAnalysis {
            tempo_bpm: estimate_tempo(&[]),
            ..Default::default()
        },
    };

    let flux = spectral_flux(&audio.samples, audio.sample_rate, params);
    let onset_times = detect_onsets(&flux);
    let tempo_bpm = estimate_tempo(&onset_times);

    let mut frames: Vec<usize> = onset_times
        .iter()
        .map(|&t| (t * fps as f32) as usize)
        .collect();
    frames.dedup();

    log::info!(
        "Onsets: {} detected, tempo={:.1} BPM",
        onset_times.len(),
        tempo_bpm
    );

    BeatAnalysis {
        onset_times,
        frames,
        tempo_bpm,
    }
}

/// Positive magnitude change between consecutive windows, as (time, flux).
fn spectral_flux(samples: &[f32], sample_rate: u32, params: &ExtractionParams) -> Vec<(f32, f32)> {
    let n_fft = params.fft_size;
    let hop = params.hop_length.max(1);
    let transform = RustFftTransform::new(n_fft);

    let mut prev_magnitudes = vec![0.0f32; n_fft / 2 + 1];
    let mut flux_values: Vec<(f32, f32)> = Vec::new();

    let mut pos = 0;
    while pos + n_fft <= samples.len() {
        let magnitudes = transform.magnitudes(&samples[pos..pos + n_fft]);

        let flux: f32 = magnitudes
            .iter()
            .zip(prev_magnitudes.iter())
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum();

        let time = pos as f32 / sample_rate as f32;
        flux_values.push((time, flux));
        prev_magnitudes = magnitudes;
        pos += hop;
    }

    flux_values
}

fn detect_onsets(flux_values: &[(f32, f32)]) -> Vec<f32> {
    if flux_values.is_empty() {
        return Vec::new();
    }

    let window = 20;
    let mut onset_times: Vec<f32> = Vec::new();

    for i in 0..flux_values.len() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(flux_values.len());
        let local_mean: f32 = flux_values[start..end].iter().map(|(_, f)| f).sum::<f32>()
            / (end - start) as f32;

        let threshold = local_mean * 1.5 + 0.01;
        if flux_values[i].1 <= threshold {
            continue;
        }

        let is_peak = (i == 0 || flux_values[i].1 >= flux_values[i - 1].1)
            && (i == flux_values.len() - 1 || flux_values[i].1 >= flux_values[i + 1].1);

        // At least 100ms between onsets
        let far_enough = onset_times
            .last()
            .map_or(true, |&last| flux_values[i].0 - last > 0.1);

        if is_peak && far_enough {
            onset_times.push(flux_values[i].0);
        }
    }

    onset_times
}

/// BPM from the median inter-onset interval in the 60-200 BPM range,
/// 120 when there is not enough evidence.
pub fn estimate_tempo(onset_times: &[f32]) -> f32 {
    let mut reasonable: Vec<f32> = onset_times
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&i| (0.3..=1.0).contains(&i))
        .collect();

    if reasonable.is_empty() {
        return 120.0;
    }

    reasonable.sort_by(|a, b| a.total_cmp(b));
    60.0 / reasonable[reasonable.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 22050;

    fn clicks(period_secs: f32, total_secs: f32) -> SampleBuffer {
        let n = (total_secs * SR as f32) as usize;
        let period = (period_secs * SR as f32) as usize;
        let burst = SR as usize / 20;
        let samples = (0..n)
            .map(|i| {
                if i % period < burst {
                    (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / SR as f32).sin() * 0.8
                } else {
                    0.0
                }
            })
            .collect();
        SampleBuffer::new(samples, SR)
    }

    #[test]
    fn mel_without_audio_is_zero_column() {
        let mel = mel_spectrogram(None, &ExtractionParams::default(), 128);
        assert_eq!(mel.len(), 128);
        assert!(mel.iter().all(|row| row == &vec![0.0]));
    }

    #[test]
    fn mel_shape_follows_hop() {
        let audio = SampleBuffer::new(vec![0.1; SR as usize], SR);
        let params = ExtractionParams::default();
        let mel = mel_spectrogram(Some(&audio), &params, 40);
        assert_eq!(mel.len(), 40);
        assert_eq!(mel[0].len(), 1 + SR as usize / params.hop_length);
    }

    #[test]
    fn mel_is_relative_to_max_and_floored() {
        let audio = clicks(0.5, 1.0);
        let mel = mel_spectrogram(Some(&audio), &ExtractionParams::default(), 64);
        let max = mel.iter().flatten().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = mel.iter().flatten().copied().fold(f32::INFINITY, f32::min);
        assert!(max.abs() < 1e-3);
        assert!(min >= -80.0 - 1e-3);
    }

    #[test]
    fn filterbank_rows_are_non_negative() {
        let filters = mel_filterbank(SR, 2048, 32);
        assert_eq!(filters.len(), 32);
        assert!(filters.iter().all(|row| row.len() == 1025));
        assert!(filters.iter().flatten().all(|&w| w >= 0.0));
        assert!(filters.iter().all(|row| row.iter().any(|&w| w > 0.0)));
    }

    #[test]
    fn click_train_tempo() {
        let audio = clicks(0.5, 4.0);
        let beats = beat_positions(Some(&audio), &ExtractionParams::default(), 30);
        assert!(beats.onset_times.len() >= 4, "onsets: {:?}", beats.onset_times);
        assert!(beats.onset_times.windows(2).all(|w| w[1] - w[0] > 0.1));
        assert!(beats.frames.windows(2).all(|w| w[0] < w[1]));
        assert!((100.0..=140.0).contains(&beats.tempo_bpm), "tempo {}", beats.tempo_bpm);
    }

    #[test]
    fn no_audio_no_beats() {
        let beats = beat_positions(None, &ExtractionParams::default(), 30);
        assert!(beats.onset_times.is_empty());
        assert!(beats.frames.is_empty());
        assert_eq!(beats.tempo_bpm, 120.0);
    }

    #[test]
    fn tempo_defaults_without_evidence() {
        assert_eq!(estimate_tempo(&[1.0]), 120.0);
        assert_eq!(estimate_tempo(&[0.0, 0.1, 0.2]), 120.0);
        assert!((estimate_tempo(&[0.0, 0.5, 1.0, 1.5]) - 120.0).abs() < 1e-3);
    }
}
