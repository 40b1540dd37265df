//! Filter-graph contract and lifecycle control
//!
//! The graph itself (capture stream, biquad cascade, playback stream bound
//! to the selected endpoint) is built by a platform backend in the `infra`
//! crate. This module defines the contract the backend implements and the
//! controller that owns the single live graph.
//!
//! A built graph is either fully connected or fully torn down; no
//! half-connected state is observable. The controller guarantees the
//! previous graph is completely stopped and dropped before the next build
//! starts, so two graphs never hold the same output device.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::audio::DeviceId;
use crate::domain::combine::CombinedFilterSet;

pub type Result<T> = std::result::Result<T, GraphBuildError>;

/// Errors raised while constructing, connecting or starting a graph
///
/// Each variant carries the underlying platform status so callers can
/// surface it verbatim.
#[derive(Debug, Error)]
pub enum GraphBuildError {
    /// The selected output endpoint could not be bound
    #[error("Output device binding failed: {code}")]
    OutputBinding { code: String },

    /// No usable capture device for the graph's source side
    #[error("Capture source unavailable: {code}")]
    SourceUnavailable { code: String },

    /// The sink does not accept the source's native stream format
    #[error("Stream format mismatch: {sample_rate_hz} Hz / {channels} ch not supported by {device}")]
    FormatMismatch {
        device: String,
        sample_rate_hz: u32,
        channels: u16,
    },

    /// Stream construction failed at the platform layer
    #[error("Stream error: {code}")]
    Stream { code: String },

    /// The prepared graph could not be started
    #[error("Failed to start audio path: {code}")]
    Start { code: String },
}

/// A fully prepared processing graph
///
/// Returned by [`GraphBackend::build`] in a prepared-but-stopped state.
/// Dropping the graph must release every platform handle it holds,
/// including on paths that never called `start`.
///
/// Deliberately not `Send`: platform stream handles are pinned to the
/// control thread that built them, and so is the controller owning the
/// graph. Only the platform's own callback thread touches samples.
pub trait ActiveGraph {
    /// Open the live audio path
    fn start(&mut self) -> Result<()>;

    /// Halt the live audio path; must be idempotent
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Number of filter stages between source and sink
    fn stage_count(&self) -> usize;
}

/// Platform seam for graph construction
///
/// `build` either returns a fully prepared graph or fails having already
/// released anything it created along the way.
pub trait GraphBackend: Send + Sync {
    fn build(
        &self,
        filters: &CombinedFilterSet,
        output: &DeviceId,
    ) -> Result<Box<dyn ActiveGraph>>;
}

/// Lifecycle state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Building,
    Running,
}

/// Owner of the single live filter graph
///
/// Not a process-wide singleton: each controller instance owns at most one
/// graph, and exclusivity comes from always stopping and dropping the
/// previous graph before building the next.
pub struct EqController {
    backend: Arc<dyn GraphBackend>,
    graph: Option<Box<dyn ActiveGraph>>,
    state: ControllerState,
}

impl EqController {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self {
            backend,
            graph: None,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ControllerState::Running
    }

    /// Tear down any running graph, then build and start a new one
    ///
    /// The stop completes fully (callbacks halted, handles released) before
    /// the build begins. On any failure the controller returns to `Idle`
    /// with no audio path active.
    pub fn apply(&mut self, filters: &CombinedFilterSet, output: &DeviceId) -> Result<()> {
        self.stop();

        self.state = ControllerState::Building;
        debug!(
            bands = filters.bands.len(),
            preamp_db = filters.preamp_db,
            device = output.as_str(),
            "Building filter graph"
        );

        let mut graph = match self.backend.build(filters, output) {
            Ok(graph) => graph,
            Err(e) => {
                self.state = ControllerState::Idle;
                error!(error = %e, "Graph build failed");
                return Err(e);
            }
        };

        if let Err(e) = graph.start() {
            // The failed graph is dropped here, releasing its handles
            self.state = ControllerState::Idle;
            error!(error = %e, "Graph start failed");
            return Err(e);
        }

        info!(
            stages = graph.stage_count(),
            device = output.as_str(),
            "Filter graph running"
        );
        self.graph = Some(graph);
        self.state = ControllerState::Running;
        Ok(())
    }

    /// Halt and release the live graph, if any
    ///
    /// Idempotent: calling while `Idle` is a no-op. Returns only after the
    /// graph's handles are released, so a following `apply` can rebind the
    /// same device.
    pub fn stop(&mut self) {
        if let Some(mut graph) = self.graph.take() {
            info!("Stopping filter graph");
            graph.stop();
        }
        self.state = ControllerState::Idle;
    }
}

impl Drop for EqController {
    fn drop(&mut self) {
        if self.graph.is_some() {
            warn!("Controller dropped while running, stopping graph");
            self.stop();
        }
    }
}
