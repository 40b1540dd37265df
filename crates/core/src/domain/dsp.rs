//! Biquad rendering stages for parametric EQ corrections
//!
//! A [`CombinedFilterSet`] is rendered as a cascade of biquad IIR filters,
//! one stage per band, in band order, followed by a single global preamp
//! gain. All stages share one stream format; there is no per-stage
//! conversion.
//!
//! Designed for:
//! - Zero allocations in the hot path
//! - Minimal latency (< 1ms)
//! - < 1% CPU for a typical 10-band correction

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::combine::CombinedFilterSet;
use crate::domain::profile::{FilterBand, FilterKind};

/// Parameter constraints for the rendering stages
///
/// Parameters are clamped to these ranges before coefficient computation to
/// keep the filters numerically stable.
pub mod params {
    /// Decibel range for band gains and the preamp
    ///
    /// AutoEq corrections regularly exceed mixer-style ±12 dB, so the clamp
    /// covers the full range the profile format produces in practice.
    pub const DB_MIN: f64 = -30.0;
    pub const DB_MAX: f64 = 30.0;

    /// Q factor range
    pub const Q_MIN: f64 = 0.05;
    pub const Q_MAX: f64 = 20.0;
}

// ============================================================================
// BIQUAD FILTER (Low-level IIR filter)
// ============================================================================

/// Biquad filter coefficients
///
/// Direct Form I implementation for numerical stability. Coefficients are
/// pre-computed; a0 is normalized to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        // Unity gain (no filtering)
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    /// Peaking EQ coefficients from bandwidth in octaves
    ///
    /// Profile Q factors reach the renderer as a bandwidth of `1/Q` octaves,
    /// so the peaking form consumes bandwidth directly.
    #[must_use]
    pub fn peaking(sample_rate: f32, freq: f32, gain_db: f32, bandwidth_octaves: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha =
            sin_w0 * ((std::f32::consts::LN_2 / 2.0) * bandwidth_octaves * w0 / sin_w0).sinh();

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * a;

        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / a;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Low shelf coefficients
    ///
    /// Boosts or cuts frequencies below the corner frequency.
    #[must_use]
    pub fn low_shelf(sample_rate: f32, freq: f32, gain_db: f32, q: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha);
        let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha);

        let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// High shelf coefficients
    ///
    /// Boosts or cuts frequencies above the corner frequency.
    #[must_use]
    pub fn high_shelf(sample_rate: f32, freq: f32, gain_db: f32, q: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha);

        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Stateful biquad filter using Direct Form I
///
/// Direct Form I is chosen over Transposed Direct Form II for better
/// numerical behavior with low-frequency filters and artifact-free
/// coefficient updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    // Previous input samples (x[n-1], x[n-2])
    x1: f32,
    x2: f32,
    // Previous output samples (y[n-1], y[n-2])
    y1: f32,
    y2: f32,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
        let y = self.coeffs.b0 * x
            + self.coeffs.b1 * self.x1
            + self.coeffs.b2 * self.x2
            - self.coeffs.a1 * self.y1
            - self.coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

// ============================================================================
// EQ STAGE AND CHAIN
// ============================================================================

/// One rendered filter stage: a [`FilterBand`] bound to per-channel biquads
///
/// Stages are always enabled; a band that should not affect the signal
/// simply does not appear in the set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EqStage {
    kind: FilterKind,
    center_frequency_hz: f64,
    gain_db: f64,
    bandwidth_octaves: f64,
    bypass: bool,
    filters: Vec<BiquadFilter>,
}

impl EqStage {
    /// Render one band at a given stream format
    pub fn from_band(band: &FilterBand, sample_rate: u32, channels: u16) -> Self {
        let gain_db = band.gain_db.clamp(params::DB_MIN, params::DB_MAX);
        let q = band.q_factor.clamp(params::Q_MIN, params::Q_MAX);
        let bandwidth_octaves = 1.0 / q;

        let sr = sample_rate as f32;
        let freq = band.center_frequency_hz as f32;
        let coeffs = match band.kind {
            FilterKind::Peaking => {
                BiquadCoeffs::peaking(sr, freq, gain_db as f32, bandwidth_octaves as f32)
            }
            FilterKind::LowShelf => BiquadCoeffs::low_shelf(sr, freq, gain_db as f32, q as f32),
            FilterKind::HighShelf => BiquadCoeffs::high_shelf(sr, freq, gain_db as f32, q as f32),
        };

        Self {
            kind: band.kind,
            center_frequency_hz: band.center_frequency_hz,
            gain_db,
            bandwidth_octaves,
            bypass: false,
            filters: vec![BiquadFilter::new(coeffs); channels.max(1) as usize],
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn center_frequency_hz(&self) -> f64 {
        self.center_frequency_hz
    }

    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    /// Bandwidth in octaves, fixed at `1/Q`
    pub fn bandwidth_octaves(&self) -> f64 {
        self.bandwidth_octaves
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    /// Process one interleaved frame in-place
    #[inline]
    fn process_frame(&mut self, frame: &mut [f32]) {
        for (sample, filter) in frame.iter_mut().zip(self.filters.iter_mut()) {
            *sample = filter.process_sample(*sample);
        }
    }

    fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}

/// Cascade of EQ stages plus a global preamp
///
/// Stage order is band order; the cascade is applied in strict index order
/// so shelf filters land where the profile author placed them. The preamp
/// is applied after all stages. Zero stages is legal and yields a
/// preamp-only passthrough.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EqChain {
    stages: Vec<EqStage>,
    preamp_db: f64,
    preamp_gain: f32,
    channels: usize,
    sample_rate: u32,
}

impl EqChain {
    /// Render a combined filter set at a negotiated stream format
    ///
    /// Allocates exactly one stage per band; `stages().len()` always equals
    /// `set.bands.len()`.
    pub fn from_filter_set(set: &CombinedFilterSet, sample_rate: u32, channels: u16) -> Self {
        let preamp_db = set.preamp_db.clamp(params::DB_MIN, params::DB_MAX);
        let stages = set
            .bands
            .iter()
            .map(|band| EqStage::from_band(band, sample_rate, channels))
            .collect::<Vec<_>>();

        trace!(
            stages = stages.len(),
            preamp_db,
            sample_rate,
            channels,
            "Rendered EQ chain"
        );

        Self {
            stages,
            preamp_db,
            preamp_gain: db_to_gain(preamp_db as f32),
            channels: channels.max(1) as usize,
            sample_rate,
        }
    }

    pub fn stages(&self) -> &[EqStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn preamp_db(&self) -> f64 {
        self.preamp_db
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Process an interleaved buffer in-place
    ///
    /// A trailing partial frame (buffer length not a multiple of the channel
    /// count) is processed with the leading channels' filters.
    pub fn process(&mut self, buffer: &mut [f32]) {
        for frame in buffer.chunks_mut(self.channels) {
            for stage in &mut self.stages {
                stage.process_frame(frame);
            }
        }

        if self.preamp_gain != 1.0 {
            for sample in buffer.iter_mut() {
                *sample *= self.preamp_gain;
            }
        }
    }

    /// Clear all filter state without touching parameters
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}

/// Convert decibels to a linear gain factor
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}
