//! Domain entities and business rules

pub mod audio;
pub mod combine;
pub mod config;
pub mod dsp;
pub mod graph;
pub mod profile;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{
    AudioDevice, AudioEnumerator, AudioError, ChannelCount, DeviceId, DeviceInfo, DeviceType,
    SampleFormat, SampleRate, StreamConfig,
};
pub use combine::{combine, invert, CombinedFilterSet};
pub use config::{AppConfig, AttuneConfig, ConfigError, ConfigManager, OutputConfig, ProfileWatcher};
pub use dsp::{db_to_gain, BiquadCoeffs, BiquadFilter, EqChain, EqStage};
pub use graph::{ActiveGraph, ControllerState, EqController, GraphBackend, GraphBuildError};
pub use profile::{
    parse_profile, FilterBand, FilterKind, ParsedProfile, Profile, ProfileError, ProfileLibrary,
    ProfileSource, SkippedLine,
};
