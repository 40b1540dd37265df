//! Engine entry point consumed by UI layers
//!
//! One [`EqService`] instance per caller: it loads profiles fresh on every
//! apply, combines them, and drives the lifecycle controller. All methods
//! return structured results that render as human-readable status lines;
//! none of them can take the process down.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use attune_core::domain::audio::AudioEnumerator;
use attune_core::domain::combine::{combine, CombinedFilterSet};
use attune_core::domain::graph::{EqController, GraphBuildError};
use attune_core::domain::profile::{ProfileError, ProfileLibrary, ProfileSource};
use attune_core::domain::{DeviceId, DeviceInfo};
use thiserror::Error;
use tracing::{info, warn};

use crate::audio::{CpalEnumerator, CpalGraphBackend};

/// Which of the two profile slots failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileRole {
    Mine,
    Target,
}

impl fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileRole::Mine => write!(f, "Your"),
            ProfileRole::Target => write!(f, "Target"),
        }
    }
}

/// Errors surfaced by [`EqService::apply_eq_settings`]
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{which} headphone model was not found")]
    ProfileNotFound { which: ProfileRole },

    #[error("{which} profile could not be read: {source}")]
    ProfileUnreadable {
        which: ProfileRole,
        source: ProfileError,
    },

    #[error(transparent)]
    Graph(#[from] GraphBuildError),
}

/// Successful apply, with enough detail for a status line
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub bands: usize,
    pub preamp_db: f64,
    pub differential: bool,
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EQ settings applied successfully ({} band{}, preamp {:+.1} dB{})",
            self.bands,
            if self.bands == 1 { "" } else { "s" },
            self.preamp_db,
            if self.differential { ", differential" } else { "" },
        )
    }
}

/// The EQ engine facade
///
/// Owns the profile library, the device enumerator and the lifecycle
/// controller. Single-threaded by design: graph control must stay on one
/// control thread.
pub struct EqService {
    library: ProfileLibrary,
    enumerator: Arc<CpalEnumerator>,
    controller: EqController,
}

impl EqService {
    pub fn new(profile_dir: PathBuf, buffer_size: u32) -> Self {
        let enumerator = Arc::new(CpalEnumerator::new());
        let backend = Arc::new(CpalGraphBackend::new(enumerator.clone(), buffer_size));

        Self {
            library: ProfileLibrary::new(profile_dir),
            enumerator,
            controller: EqController::new(backend),
        }
    }

    /// Load, combine and apply EQ settings to the live audio path
    ///
    /// An empty or absent target model applies `my_model`'s correction
    /// as-is; otherwise the differential correction toward the target is
    /// computed. Any running graph is fully torn down first.
    pub async fn apply_eq_settings(
        &mut self,
        my_model: &str,
        target_model: Option<&str>,
        output: &DeviceId,
    ) -> Result<ApplyOutcome, ApplyError> {
        let filters = self.load_and_combine(my_model, target_model).await?;
        let differential = target_model.is_some_and(|t| !t.is_empty());

        self.controller.apply(&filters, output)?;

        let outcome = ApplyOutcome {
            bands: filters.bands.len(),
            preamp_db: filters.preamp_db,
            differential,
        };
        info!(%outcome, device = output.as_str(), "Apply complete");
        Ok(outcome)
    }

    /// Halt the live audio path
    ///
    /// Always succeeds; calling without a running path is a no-op.
    pub fn stop_eq_settings(&mut self) {
        self.controller.stop();
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// List selectable output endpoints
    ///
    /// Enumeration failures degrade to an empty list; they are logged, not
    /// fatal.
    pub fn list_output_devices(&self) -> Vec<DeviceInfo> {
        match self.enumerator.output_endpoints() {
            Ok(endpoints) => endpoints,
            Err(e) => {
                warn!(error = %e, "Device enumeration failed");
                Vec::new()
            }
        }
    }

    /// List headphone models available in the profile library
    pub async fn list_models(&self) -> Result<Vec<String>, ProfileError> {
        self.library.list_models().await
    }

    async fn load_and_combine(
        &self,
        my_model: &str,
        target_model: Option<&str>,
    ) -> Result<CombinedFilterSet, ApplyError> {
        let mine = self.load_profile(my_model, ProfileRole::Mine).await?;

        let target = match target_model {
            Some(model) if !model.is_empty() => {
                Some(self.load_profile(model, ProfileRole::Target).await?)
            }
            _ => None,
        };

        Ok(combine(&mine, target.as_ref()))
    }

    async fn load_profile(
        &self,
        model: &str,
        which: ProfileRole,
    ) -> Result<attune_core::domain::profile::Profile, ApplyError> {
        let parsed = match self.library.load(model).await {
            Ok(parsed) => parsed,
            Err(ProfileError::NotFound(_)) => {
                return Err(ApplyError::ProfileNotFound { which });
            }
            Err(source) => {
                return Err(ApplyError::ProfileUnreadable { which, source });
            }
        };

        if !parsed.skipped.is_empty() {
            warn!(
                model,
                skipped = parsed.skipped.len(),
                "Profile contained unparsed lines"
            );
        }

        Ok(parsed.profile)
    }
}
