//! In-place preprocessing applied to the decoded buffer before analysis.

/// Scale samples so the loudest one hits ±1.0. Silent buffers are untouched.
pub fn normalize(samples: &mut [f32]) {
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if peak > 0.0 {
        for s in samples.iter_mut() {
            *s /= peak;
        }
    }
}

/// Linear fade in and fade out of `fade_secs` each, never longer than a
/// quarter of the buffer.
pub fn apply_fade(samples: &mut [f32], sample_rate: u32, fade_secs: f32) {
    let fade_len = ((fade_secs.max(0.0) * sample_rate as f32) as usize).min(samples.len() / 4);
    if fade_len == 0 {
        return;
    }

    let len = samples.len();
    let denom = (fade_len - 1).max(1) as f32;
    for i in 0..fade_len {
        let gain = i as f32 / denom;
        samples[i] *= gain;
        samples[len - 1 - i] *= gain;
    }
}
