//! Integration tests for the EQ pipeline
//!
//! These tests verify the complete configuration flow from profile text to
//! a running filter graph: parsing, differential combination, chain
//! rendering, and lifecycle control with exclusive device ownership.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use attune_core::domain::combine::{combine, CombinedFilterSet};
use attune_core::domain::dsp::EqChain;
use attune_core::domain::graph::{
    ActiveGraph, ControllerState, EqController, GraphBackend, GraphBuildError,
};
use attune_core::domain::profile::{parse_profile, FilterKind, ProfileLibrary, ProfileSource};
use attune_core::domain::DeviceId;

const MY_PROFILE: &str = "\
# AutoEq correction
Preamp: -4.2 dB
Filter 1: ON PK Fc 105 Hz Gain 3.5 dB Q 0.70
Filter 2: ON LSC Fc 21 Hz Gain 6.0 dB Q 0.71
";

const TARGET_PROFILE: &str = "\
Preamp: -1.8 dB
Filter 1: ON PK Fc 105 Hz Gain 1.5 dB Q 0.50
Filter 2: ON LSC Fc 21 Hz Gain 2.0 dB Q 0.71
";

fn output() -> DeviceId {
    DeviceId::new("External Headphone Amp".to_string())
}

// ============================================================================
// TEST DOUBLE: BACKEND WITH EXCLUSIVE DEVICE OWNERSHIP
// ============================================================================

/// Tracks which output devices currently belong to a live graph
///
/// Platform audio APIs forbid two graphs holding the same device; the
/// registry turns a violation into a build error the tests can assert on.
#[derive(Default)]
struct DeviceRegistry {
    held: Mutex<HashSet<String>>,
}

impl DeviceRegistry {
    fn held_count(&self) -> usize {
        self.held.lock().unwrap().len()
    }
}

struct TrackedGraph {
    registry: Arc<DeviceRegistry>,
    device: String,
    stages: usize,
    running: bool,
}

impl ActiveGraph for TrackedGraph {
    fn start(&mut self) -> Result<(), GraphBuildError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn stage_count(&self) -> usize {
        self.stages
    }
}

impl Drop for TrackedGraph {
    fn drop(&mut self) {
        self.registry.held.lock().unwrap().remove(&self.device);
    }
}

struct ExclusiveBackend {
    registry: Arc<DeviceRegistry>,
    fail_after_claim: Mutex<bool>,
}

impl ExclusiveBackend {
    fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self {
            registry,
            fail_after_claim: Mutex::new(false),
        }
    }

    fn fail_next_build(&self) {
        *self.fail_after_claim.lock().unwrap() = true;
    }
}

impl GraphBackend for ExclusiveBackend {
    fn build(
        &self,
        filters: &CombinedFilterSet,
        output: &DeviceId,
    ) -> Result<Box<dyn ActiveGraph>, GraphBuildError> {
        let device = output.as_str().to_string();

        {
            let mut held = self.registry.held.lock().unwrap();
            if !held.insert(device.clone()) {
                return Err(GraphBuildError::OutputBinding {
                    code: format!("device {} already in use", device),
                });
            }
        }

        if std::mem::take(&mut *self.fail_after_claim.lock().unwrap()) {
            // A failing build must not leak its claim
            self.registry.held.lock().unwrap().remove(&device);
            return Err(GraphBuildError::Stream {
                code: "simulated stream failure".to_string(),
            });
        }

        Ok(Box::new(TrackedGraph {
            registry: self.registry.clone(),
            device,
            stages: filters.bands.len(),
            running: false,
        }))
    }
}

// ============================================================================
// PARSE → COMBINE FLOW
// ============================================================================

#[test]
fn parse_and_identity_combine_preserves_profile() {
    let parsed = parse_profile(MY_PROFILE);
    assert!(parsed.skipped.is_empty());

    let combined = combine(&parsed.profile, None);
    assert_eq!(combined.bands.len(), 2);
    assert_eq!(combined.preamp_db, -4.2);
    assert_eq!(combined.bands[0].center_frequency_hz, 105.0);
    assert_eq!(combined.bands[1].kind, FilterKind::LowShelf);
}

#[test]
fn parse_and_differential_combine() {
    let mine = parse_profile(MY_PROFILE).profile;
    let target = parse_profile(TARGET_PROFILE).profile;

    let combined = combine(&mine, Some(&target));

    assert_eq!(combined.bands.len(), 2);
    // 3.5 + (-1.5)
    assert!((combined.bands[0].gain_db - 2.0).abs() < 1e-9);
    // (0.70 + 0.50) / 2
    assert!((combined.bands[0].q_factor - 0.60).abs() < 1e-9);
    // 6.0 + (-2.0)
    assert!((combined.bands[1].gain_db - 4.0).abs() < 1e-9);
    // -4.2 + -1.8
    assert!((combined.preamp_db - -6.0).abs() < 1e-9);
}

#[test]
fn combine_pairs_bands_by_index_not_frequency() {
    // The two profiles sit on different frequency grids. Combination is
    // positional, so the target's 8000 Hz gain lands on the 105 Hz band.
    // Profiles are assumed to share a frequency grid; nothing detects a
    // mismatch.
    let mine = parse_profile("Filter 1: ON PK Fc 105 Hz Gain 3.0 dB Q 1.00\n").profile;
    let target = parse_profile("Filter 1: ON PK Fc 8000 Hz Gain 5.0 dB Q 1.00\n").profile;

    let combined = combine(&mine, Some(&target));
    assert_eq!(combined.bands[0].center_frequency_hz, 105.0);
    assert!((combined.bands[0].gain_db - -2.0).abs() < 1e-9);
}

#[test]
fn malformed_lines_do_not_abort_the_flow() {
    let text = "\
Preamp: -2.0 dB
Filter 1: ON PK Fc 105 Hz Gain 3.5 dB Q 0.70
garbage in the middle
Filter 3: ON HSC Fc 9000 Hz Gain -1.0 dB Q 0.50
";
    let parsed = parse_profile(text);
    assert_eq!(parsed.profile.bands.len(), 2);
    assert_eq!(parsed.skipped.len(), 1);

    let combined = combine(&parsed.profile, None);
    let chain = EqChain::from_filter_set(&combined, 48000, 2);
    assert_eq!(chain.len(), 2);
}

// ============================================================================
// CHAIN RENDERING
// ============================================================================

#[test]
fn rendered_chain_matches_combined_set() {
    let mine = parse_profile(MY_PROFILE).profile;
    let target = parse_profile(TARGET_PROFILE).profile;
    let combined = combine(&mine, Some(&target));

    let chain = EqChain::from_filter_set(&combined, 48000, 2);
    assert_eq!(chain.len(), combined.bands.len());

    for (stage, band) in chain.stages().iter().zip(combined.bands.iter()) {
        assert!(!stage.is_bypassed());
        assert_eq!(stage.kind(), band.kind);
        assert!((stage.bandwidth_octaves() - 1.0 / band.q_factor).abs() < 1e-9);
    }
}

#[test]
fn empty_filter_set_builds_a_zero_stage_chain() {
    let combined = combine(&parse_profile("# nothing here\n").profile, None);
    let mut chain = EqChain::from_filter_set(&combined, 48000, 2);

    assert_eq!(chain.len(), 0);
    let mut buffer = vec![0.25_f32; 32];
    chain.process(&mut buffer);
    assert_eq!(buffer, vec![0.25_f32; 32]);
}

// ============================================================================
// LIFECYCLE AND DEVICE OWNERSHIP
// ============================================================================

#[test]
fn apply_holds_exactly_one_device() {
    let registry = Arc::new(DeviceRegistry::default());
    let backend = Arc::new(ExclusiveBackend::new(registry.clone()));
    let mut controller = EqController::new(backend);

    let filters = combine(&parse_profile(MY_PROFILE).profile, None);
    controller.apply(&filters, &output()).unwrap();

    assert_eq!(controller.state(), ControllerState::Running);
    assert_eq!(registry.held_count(), 1);
}

#[test]
fn reapply_releases_the_device_before_rebinding() {
    let registry = Arc::new(DeviceRegistry::default());
    let backend = Arc::new(ExclusiveBackend::new(registry.clone()));
    let mut controller = EqController::new(backend);

    let filters = combine(&parse_profile(MY_PROFILE).profile, None);

    // If the controller did not fully stop the old graph first, the second
    // build would find the device still held and fail
    controller.apply(&filters, &output()).unwrap();
    controller.apply(&filters, &output()).unwrap();

    assert_eq!(controller.state(), ControllerState::Running);
    assert_eq!(registry.held_count(), 1);
}

#[test]
fn stop_releases_the_device_and_is_idempotent() {
    let registry = Arc::new(DeviceRegistry::default());
    let backend = Arc::new(ExclusiveBackend::new(registry.clone()));
    let mut controller = EqController::new(backend);

    // Stop before ever starting: no-op
    controller.stop();
    assert_eq!(controller.state(), ControllerState::Idle);

    let filters = combine(&parse_profile(MY_PROFILE).profile, None);
    controller.apply(&filters, &output()).unwrap();
    assert_eq!(registry.held_count(), 1);

    controller.stop();
    controller.stop();
    assert_eq!(controller.state(), ControllerState::Idle);
    assert_eq!(registry.held_count(), 0);
}

#[test]
fn failed_build_leaves_no_device_claim() {
    let registry = Arc::new(DeviceRegistry::default());
    let backend = Arc::new(ExclusiveBackend::new(registry.clone()));
    backend.fail_next_build();
    let mut controller = EqController::new(backend);

    let filters = combine(&parse_profile(MY_PROFILE).profile, None);
    let err = controller.apply(&filters, &output()).unwrap_err();

    assert!(matches!(err, GraphBuildError::Stream { .. }));
    assert_eq!(controller.state(), ControllerState::Idle);
    assert_eq!(registry.held_count(), 0);

    // And the engine recovers on the next attempt
    controller.apply(&filters, &output()).unwrap();
    assert_eq!(registry.held_count(), 1);
}

#[test]
fn reapply_across_varying_band_counts() {
    let registry = Arc::new(DeviceRegistry::default());
    let backend = Arc::new(ExclusiveBackend::new(registry.clone()));
    let mut controller = EqController::new(backend);

    // Zero bands included: a filterless profile still yields a valid graph
    for bands in [0usize, 1, 10] {
        let text: String = (0..bands)
            .map(|i| {
                format!(
                    "Filter {}: ON PK Fc {} Hz Gain 1.0 dB Q 1.00\n",
                    i + 1,
                    100 * (i + 1)
                )
            })
            .collect();
        let filters = combine(&parse_profile(&text).profile, None);
        assert_eq!(filters.bands.len(), bands);

        controller.apply(&filters, &output()).unwrap();
        assert_eq!(controller.state(), ControllerState::Running);
        assert_eq!(registry.held_count(), 1);
    }
}

#[test]
fn independent_controllers_can_hold_different_devices() {
    let registry = Arc::new(DeviceRegistry::default());
    let mut a = EqController::new(Arc::new(ExclusiveBackend::new(registry.clone())));
    let mut b = EqController::new(Arc::new(ExclusiveBackend::new(registry.clone())));

    let filters = combine(&parse_profile(MY_PROFILE).profile, None);
    a.apply(&filters, &DeviceId::new("Speakers".to_string())).unwrap();
    b.apply(&filters, &DeviceId::new("Headphones".to_string())).unwrap();

    assert_eq!(registry.held_count(), 2);

    a.stop();
    assert_eq!(registry.held_count(), 1);
    assert_eq!(b.state(), ControllerState::Running);
}

// ============================================================================
// LIBRARY-BACKED FLOW
// ============================================================================

#[tokio::test]
async fn library_to_running_graph() {
    let dir = tempfile::TempDir::new().unwrap();
    tokio::fs::write(dir.path().join("HD 650 ParametricEQ.txt"), MY_PROFILE)
        .await
        .unwrap();
    tokio::fs::write(dir.path().join("HD 800S ParametricEQ.txt"), TARGET_PROFILE)
        .await
        .unwrap();

    let library = ProfileLibrary::new(dir.path().to_path_buf());
    let models = library.list_models().await.unwrap();
    assert_eq!(models, vec!["HD 650", "HD 800S"]);

    let mine = library.load("HD 650").await.unwrap().profile;
    let target = library.load("HD 800S").await.unwrap().profile;
    let combined = combine(&mine, Some(&target));

    let registry = Arc::new(DeviceRegistry::default());
    let backend = Arc::new(ExclusiveBackend::new(registry.clone()));
    let mut controller = EqController::new(backend);

    controller.apply(&combined, &output()).unwrap();
    assert_eq!(controller.state(), ControllerState::Running);
    assert_eq!(registry.held_count(), 1);

    controller.stop();
    assert_eq!(registry.held_count(), 0);
}
