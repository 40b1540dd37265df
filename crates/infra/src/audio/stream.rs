//! Real-time capture and playback stream plumbing
//!
//! Streams are built prepared-but-paused so graph construction (an explicit
//! finalize step) stays distinct from starting the audio path. Sample
//! buffers travel from the capture callback to the playback callback over a
//! bounded crossbeam channel; neither callback ever blocks.

use attune_core::domain::audio::{AudioError, Result, StreamConfig};
use attune_core::domain::dsp::EqChain;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig as CpalStreamConfig;
use crossbeam::channel::{bounded, Receiver, Sender};
use tracing::{debug, error};

/// Audio buffer containing interleaved samples
pub type AudioBuffer = Vec<f32>;

/// Capacity of the capture→playback channel, in buffers
///
/// Small on purpose: backpressure drops capture buffers instead of letting
/// latency grow unbounded.
const CHANNEL_CAPACITY: usize = 8;

/// Reassembles arbitrarily-sized capture buffers into playback requests
///
/// The capture and playback sides rarely agree on callback size, so a
/// partial buffer is carried over between playback callbacks. Shortfall is
/// filled with silence.
pub struct ChunkAssembler {
    pending: AudioBuffer,
    pos: usize,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            pos: 0,
        }
    }

    /// Fill `out`, pulling processed buffers from `receiver` as needed
    ///
    /// `process` runs once per freshly received buffer, before any of its
    /// samples are handed out. Returns the number of real (non-silence)
    /// samples written.
    pub fn fill(
        &mut self,
        out: &mut [f32],
        receiver: &Receiver<AudioBuffer>,
        mut process: impl FnMut(&mut [f32]),
    ) -> usize {
        let mut filled = 0;

        loop {
            if self.pos < self.pending.len() {
                let n = (out.len() - filled).min(self.pending.len() - self.pos);
                out[filled..filled + n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
                filled += n;
                self.pos += n;
            }

            if filled == out.len() {
                return filled;
            }

            match receiver.try_recv() {
                Ok(mut buffer) => {
                    process(&mut buffer);
                    self.pending = buffer;
                    self.pos = 0;
                }
                Err(_) => {
                    // Underrun: no data available, output silence
                    out[filled..].fill(0.0);
                    return filled;
                }
            }
        }
    }
}

impl Default for ChunkAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn to_cpal_config(config: &StreamConfig) -> CpalStreamConfig {
    CpalStreamConfig {
        channels: config.channels.count(),
        sample_rate: config.sample_rate.hz(),
        buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
    }
}

/// Build a paused capture stream feeding a bounded channel
///
/// Returns the stream and the receiving end for the playback side. Buffers
/// are dropped when the channel is full rather than blocking the callback.
pub fn build_capture_stream(
    device: &cpal::Device,
    config: &StreamConfig,
) -> Result<(cpal::Stream, Receiver<AudioBuffer>)> {
    debug!(config = ?config, "Building capture stream");

    let (sender, receiver): (Sender<AudioBuffer>, Receiver<AudioBuffer>) =
        bounded(CHANNEL_CAPACITY);

    let stream = device
        .build_input_stream(
            &to_cpal_config(config),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = sender.try_send(data.to_vec());
            },
            |err| error!("Capture stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamError(format!("Failed to build capture stream: {}", e)))?;

    // Some hosts hand streams back already rolling; normalize to paused
    stream
        .pause()
        .map_err(|e| AudioError::StreamError(format!("Failed to pause capture stream: {}", e)))?;

    Ok((stream, receiver))
}

/// Build a paused playback stream that drains the channel through the chain
///
/// The playback callback owns the EQ chain: every received buffer passes
/// through all stages in band order, then the assembler splices it into the
/// device's requested block size.
pub fn build_playback_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    receiver: Receiver<AudioBuffer>,
    mut chain: EqChain,
) -> Result<cpal::Stream> {
    debug!(config = ?config, stages = chain.len(), "Building playback stream");

    let mut assembler = ChunkAssembler::new();

    let stream = device
        .build_output_stream(
            &to_cpal_config(config),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                assembler.fill(data, &receiver, |buffer| chain.process(buffer));
            },
            |err| error!("Playback stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamError(format!("Failed to build playback stream: {}", e)))?;

    stream
        .pause()
        .map_err(|e| AudioError::StreamError(format!("Failed to pause playback stream: {}", e)))?;

    Ok(stream)
}
