//! Platform-specific audio backend implementations using CPAL
//!
//! This module provides cross-platform audio support through CPAL, which
//! abstracts platform-specific APIs:
//! - Windows: WASAPI
//! - Linux: ALSA/PulseAudio
//! - macOS: CoreAudio

pub mod cpal_backend;
pub mod graph;
pub mod stream;

pub use cpal_backend::{CpalDevice, CpalEnumerator};
pub use graph::{CpalGraph, CpalGraphBackend};
pub use stream::{build_capture_stream, build_playback_stream, AudioBuffer, ChunkAssembler};
