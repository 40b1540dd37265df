//! CPAL-backed filter graph construction
//!
//! Realizes a combined filter set as a live audio path:
//! capture stream → biquad cascade (in the playback callback) → playback
//! stream bound to the selected output endpoint.
//!
//! Build order matters: the output endpoint is bound before format
//! negotiation because the negotiated format must match a concrete device,
//! and the source's native format is then propagated unchanged to every
//! stage and the sink. A sink that cannot take that format is a
//! [`GraphBuildError::FormatMismatch`], not a conversion.

use std::sync::Arc;

use attune_core::domain::audio::{AudioDevice, SampleFormat, StreamConfig};
use attune_core::domain::combine::CombinedFilterSet;
use attune_core::domain::dsp::EqChain;
use attune_core::domain::graph::{ActiveGraph, GraphBackend, GraphBuildError, Result};
use attune_core::domain::DeviceId;
use cpal::traits::StreamTrait;
use tracing::{debug, info, warn};

use super::cpal_backend::CpalEnumerator;
use super::stream::{build_capture_stream, build_playback_stream};

/// A prepared CPAL processing graph
///
/// Holds both platform streams; the playback callback owns the rendered
/// chain. Dropping this releases the device handles whether or not the
/// graph ever ran.
pub struct CpalGraph {
    capture: cpal::Stream,
    playback: cpal::Stream,
    stage_count: usize,
    running: bool,
}

impl ActiveGraph for CpalGraph {
    fn start(&mut self) -> Result<()> {
        self.capture.play().map_err(|e| GraphBuildError::Start {
            code: e.to_string(),
        })?;

        if let Err(e) = self.playback.play() {
            // Don't leave a half-open path behind a failed start
            if let Err(pause_err) = self.capture.pause() {
                warn!("Failed to pause capture after start failure: {}", pause_err);
            }
            return Err(GraphBuildError::Start {
                code: e.to_string(),
            });
        }

        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        if let Err(e) = self.playback.pause() {
            warn!("Failed to pause playback stream: {}", e);
        }
        if let Err(e) = self.capture.pause() {
            warn!("Failed to pause capture stream: {}", e);
        }
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn stage_count(&self) -> usize {
        self.stage_count
    }
}

impl Drop for CpalGraph {
    fn drop(&mut self) {
        if self.running {
            self.stop();
        }
    }
}

/// CPAL implementation of the graph construction seam
pub struct CpalGraphBackend {
    enumerator: Arc<CpalEnumerator>,
    buffer_size: u32,
}

impl CpalGraphBackend {
    pub fn new(enumerator: Arc<CpalEnumerator>, buffer_size: u32) -> Self {
        Self {
            enumerator,
            buffer_size,
        }
    }
}

impl GraphBackend for CpalGraphBackend {
    fn build(
        &self,
        filters: &CombinedFilterSet,
        output: &DeviceId,
    ) -> Result<Box<dyn ActiveGraph>> {
        // Bind the sink endpoint first; negotiation below is against this
        // concrete device
        let sink = self
            .enumerator
            .cpal_output_device(output)
            .map_err(|e| GraphBuildError::OutputBinding {
                code: e.to_string(),
            })?;

        let source = self
            .enumerator
            .cpal_default_input()
            .map_err(|e| GraphBuildError::SourceUnavailable {
                code: e.to_string(),
            })?;

        // The source's native format becomes the one shared format for
        // every stage and the sink
        let native = source
            .default_config()
            .map_err(|e| GraphBuildError::SourceUnavailable {
                code: e.to_string(),
            })?;
        let shared = StreamConfig {
            format: SampleFormat::F32,
            buffer_size: self.buffer_size,
            ..native
        };

        if !sink.supports_config(&shared) {
            return Err(GraphBuildError::FormatMismatch {
                device: sink.info().name.clone(),
                sample_rate_hz: shared.sample_rate.hz(),
                channels: shared.channels.count(),
            });
        }

        debug!(
            sample_rate = shared.sample_rate.hz(),
            channels = shared.channels.count(),
            buffer_size = shared.buffer_size,
            "Negotiated shared stream format"
        );

        // One stage per band, enabled, in band order; zero bands is a legal
        // passthrough
        let chain = EqChain::from_filter_set(
            filters,
            shared.sample_rate.hz(),
            shared.channels.count(),
        );
        let stage_count = chain.len();

        let (capture, receiver) = build_capture_stream(source.cpal_device(), &shared)
            .map_err(|e| GraphBuildError::Stream {
                code: e.to_string(),
            })?;

        // A failure here drops `capture` on the way out, releasing the
        // source device before the error surfaces
        let playback = build_playback_stream(sink.cpal_device(), &shared, receiver, chain)
            .map_err(|e| GraphBuildError::Stream {
                code: e.to_string(),
            })?;

        info!(
            stages = stage_count,
            device = %sink.info().name,
            "Filter graph prepared"
        );

        Ok(Box::new(CpalGraph {
            capture,
            playback,
            stage_count,
            running: false,
        }))
    }
}
