//! Differential combination of two EQ profiles
//!
//! To morph headphone A toward headphone B, B's correction is inverted and
//! summed band-by-band into A's. Bands are paired by position in the file,
//! not by frequency: AutoEq emits profiles on a shared frequency grid, and
//! this module relies on that alignment. Mismatched grids pair gains with
//! the wrong frequencies silently.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::profile::{FilterBand, Profile};

/// The effective filter set fed to the graph builder
///
/// Same shape as [`Profile`], but produced by combination rules rather than
/// parsing. Rebuilt fresh on every apply; never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedFilterSet {
    pub bands: Vec<FilterBand>,
    pub preamp_db: f64,
}

/// Negate every band gain, leaving frequency, Q and kind untouched
pub fn invert(profile: &Profile) -> Profile {
    Profile {
        bands: profile
            .bands
            .iter()
            .map(|band| FilterBand {
                gain_db: -band.gain_db,
                ..*band
            })
            .collect(),
        preamp_db: profile.preamp_db,
    }
}

/// Combine two profiles into the effective correction
///
/// Without a target this is the identity. With one, the target is inverted
/// and paired positionally against `mine`:
///
/// - frequency and kind come from `mine` at that index,
/// - gains are summed (mine + inverted target),
/// - Q factors are averaged,
/// - the result is truncated to the shorter profile,
/// - preamps are summed using the target's original (non-inverted) value.
pub fn combine(mine: &Profile, target: Option<&Profile>) -> CombinedFilterSet {
    let Some(target) = target else {
        return CombinedFilterSet {
            bands: mine.bands.clone(),
            preamp_db: mine.preamp_db,
        };
    };

    let inverted = invert(target);

    let bands: Vec<FilterBand> = mine
        .bands
        .iter()
        .zip(inverted.bands.iter())
        .map(|(a, b)| FilterBand {
            center_frequency_hz: a.center_frequency_hz,
            gain_db: a.gain_db + b.gain_db,
            q_factor: (a.q_factor + b.q_factor) / 2.0,
            kind: a.kind,
        })
        .collect();

    if mine.bands.len() != target.bands.len() {
        debug!(
            mine = mine.bands.len(),
            target = target.bands.len(),
            combined = bands.len(),
            "Band counts differ, trailing bands dropped"
        );
    }

    CombinedFilterSet {
        bands,
        preamp_db: mine.preamp_db + target.preamp_db,
    }
}
