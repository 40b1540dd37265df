//! Parametric EQ profile parsing and storage
//!
//! Profiles are plain-text AutoEQ results, one file per headphone model:
//!
//! ```text
//! Preamp: -4.2 dB
//! Filter 1: ON PK Fc 105 Hz Gain 3.5 dB Q 0.70
//! Filter 2: ON LSC Fc 21 Hz Gain 6.0 dB Q 0.71
//! ```
//!
//! Parsing is line-oriented and tolerant: a malformed line is skipped and
//! recorded, never fatal. Only a missing or unreadable file is an error.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, instrument};

pub type Result<T> = std::result::Result<T, ProfileError>;

/// File name suffix that maps a model name to its profile resource
pub const PROFILE_SUFFIX: &str = " ParametricEQ";

/// Errors raised when a profile resource cannot be read
///
/// Deliberately does not cover malformed lines: those are skipped during
/// parsing and reported through [`ParsedProfile::skipped`].
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Filter shape of one parametric band
///
/// Profile files tag bands with `PK`, `LSC` or `HSC`; anything else falls
/// back to `Peaking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    #[default]
    Peaking,
    LowShelf,
    HighShelf,
}

impl FilterKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "PK" => FilterKind::Peaking,
            "LSC" => FilterKind::LowShelf,
            "HSC" => FilterKind::HighShelf,
            _ => FilterKind::Peaking,
        }
    }
}

/// One parametric EQ stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterBand {
    /// Center (or corner) frequency in Hz, always > 0 in well-formed files
    pub center_frequency_hz: f64,
    /// Boost/cut in decibels
    pub gain_db: f64,
    /// Quality factor; the rendering stage derives bandwidth as `1/q` octaves
    pub q_factor: f64,
    pub kind: FilterKind,
}

/// A parsed EQ profile: ordered bands plus a global preamp
///
/// Band order is file line order and is preserved all the way into the
/// processing chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub bands: Vec<FilterBand>,
    pub preamp_db: f64,
}

/// A line the parser could not use, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the source text
    pub line_no: usize,
    pub text: String,
}

/// Result of parsing one profile text
#[derive(Debug, Clone, Default)]
pub struct ParsedProfile {
    pub profile: Profile,
    pub skipped: Vec<SkippedLine>,
}

/// Parse a profile text
///
/// Never fails: blank lines and `#` comments are ignored, recognizable
/// `Preamp:`/`Filter` lines contribute to the profile, and everything else
/// lands in the skip list. A repeated `Preamp:` line overwrites the
/// previous value.
pub fn parse_profile(text: &str) -> ParsedProfile {
    let mut profile = Profile::default();
    let mut skipped = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with("Preamp:") {
            match parse_preamp_line(line) {
                Some(preamp) => profile.preamp_db = preamp,
                None => skipped.push(SkippedLine {
                    line_no: idx + 1,
                    text: raw.to_string(),
                }),
            }
            continue;
        }

        match parse_filter_line(line) {
            Some(band) => profile.bands.push(band),
            None => {
                debug!(line_no = idx + 1, line = raw, "Skipping unparsed profile line");
                skipped.push(SkippedLine {
                    line_no: idx + 1,
                    text: raw.to_string(),
                });
            }
        }
    }

    ParsedProfile { profile, skipped }
}

/// `Preamp: <signed-float> dB`
fn parse_preamp_line(line: &str) -> Option<f64> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("Preamp:") {
        return None;
    }
    let value = tokens.next()?.parse::<f64>().ok()?;
    if tokens.next() != Some("dB") || tokens.next().is_some() {
        return None;
    }
    Some(value)
}

/// `Filter <n>: ON <KIND> Fc <freq> Hz Gain <gain> dB Q <q>`
///
/// The `<n>` index is required by the grammar but otherwise ignored: band
/// order in the chain is file line order, not the declared index.
fn parse_filter_line(line: &str) -> Option<FilterBand> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 12 {
        return None;
    }

    if tokens[0] != "Filter"
        || !tokens[1].ends_with(':')
        || tokens[2] != "ON"
        || tokens[4] != "Fc"
        || tokens[6] != "Hz"
        || tokens[7] != "Gain"
        || tokens[9] != "dB"
        || tokens[10] != "Q"
    {
        return None;
    }

    // The index before the colon must at least be numeric
    tokens[1].trim_end_matches(':').parse::<u32>().ok()?;

    let kind = FilterKind::from_tag(tokens[3]);
    let center_frequency_hz = tokens[5].parse::<f64>().ok()?;
    let gain_db = tokens[8].parse::<f64>().ok()?;
    let q_factor = tokens[11].parse::<f64>().ok()?;

    // Frequency and Q are unsigned in the format; a non-positive value
    // means the line is malformed
    if center_frequency_hz <= 0.0 || q_factor <= 0.0 {
        return None;
    }

    Some(FilterBand {
        center_frequency_hz,
        gain_db,
        q_factor,
        kind,
    })
}

/// Async source of named profiles
///
/// Seam between the engine and profile storage so tests can substitute an
/// in-memory double for the filesystem-backed library.
#[async_trait::async_trait]
pub trait ProfileSource: Send + Sync {
    /// Load and parse the profile for a headphone model
    async fn load(&self, model: &str) -> Result<ParsedProfile>;
}

/// Directory-backed profile library
///
/// Resolves `"<model> ParametricEQ.txt"` inside its directory; model names
/// are derived back from file names by stripping the suffix.
pub struct ProfileLibrary {
    profile_dir: PathBuf,
}

impl ProfileLibrary {
    pub fn new(profile_dir: PathBuf) -> Self {
        Self { profile_dir }
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    fn profile_path(&self, model: &str) -> PathBuf {
        self.profile_dir
            .join(format!("{}{}.txt", model, PROFILE_SUFFIX))
    }

    /// List all headphone models with a profile in the library
    #[instrument(skip(self))]
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let mut models = Vec::new();

        let mut entries = fs::read_dir(&self.profile_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "txt").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    let model = stem.strip_suffix(PROFILE_SUFFIX).unwrap_or(stem);
                    models.push(model.to_string());
                }
            }
        }

        models.sort();
        debug!(count = models.len(), "Listed profile models");
        Ok(models)
    }

    /// Check if a profile exists for a model
    pub async fn model_exists(&self, model: &str) -> bool {
        fs::try_exists(self.profile_path(model))
            .await
            .unwrap_or(false)
    }
}

#[async_trait::async_trait]
impl ProfileSource for ProfileLibrary {
    #[instrument(skip(self))]
    async fn load(&self, model: &str) -> Result<ParsedProfile> {
        let path = self.profile_path(model);

        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProfileError::NotFound(model.to_string()));
            }
            Err(e) => return Err(ProfileError::Io(e)),
        };

        let parsed = parse_profile(&text);
        debug!(
            model,
            bands = parsed.profile.bands.len(),
            preamp_db = parsed.profile.preamp_db,
            skipped = parsed.skipped.len(),
            "Loaded profile"
        );
        Ok(parsed)
    }
}
