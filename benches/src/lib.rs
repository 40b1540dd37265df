//! Helper utilities for benchmarks

/// Generate a sine wave test signal
pub fn generate_sine_wave(freq: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * freq * t).sin()
        })
        .collect()
}

/// Generate deterministic pseudo-noise (xorshift, no RNG dependency)
pub fn generate_noise(frames: usize) -> Vec<f32> {
    let mut state: u32 = 0x12345678;
    (0..frames)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

/// Generate silence
pub fn generate_silence(frames: usize) -> Vec<f32> {
    vec![0.0; frames]
}

/// Calculate RMS level
pub fn calc_rms(buffer: &[f32]) -> f32 {
    let sum_sq: f32 = buffer.iter().map(|&s| s * s).sum();
    (sum_sq / buffer.len() as f32).sqrt()
}

/// Calculate peak level
pub fn calc_peak(buffer: &[f32]) -> f32 {
    buffer.iter().map(|&s| s.abs()).fold(0.0f32, f32::max)
}
