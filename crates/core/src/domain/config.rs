//! Configuration management for Attune
//!
//! This module provides:
//! - Engine configuration (profile directory, audio buffer settings)
//! - TOML serialization with async load/save
//! - Hot notification of profile-directory changes via a file watcher
//!
//! Configuration covers how the engine runs, not which correction the user
//! last applied; profiles are re-read from disk on every apply.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory containing `<model> ParametricEQ.txt` profiles
    pub profile_dir: PathBuf,

    /// Audio buffer size in frames
    pub buffer_size: u32,

    /// Preferred sample rate when the source side offers a choice
    pub sample_rate: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile_dir: PathBuf::from("profiles"),
            buffer_size: 512,
            sample_rate: 48000,
        }
    }
}

/// Output routing configuration
///
/// Empty id means "use the platform default output".
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub output_device: String,
}

/// Complete Attune configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AttuneConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AttuneConfig {
    /// Load configuration from a TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to a TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }
}

/// Manager for the main configuration file
///
/// Handles `~/.config/attune/config.toml` (platform equivalent elsewhere)
/// with factory defaults for missing files and backup of corrupt ones.
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("config.toml");
        Self {
            config_dir,
            config_path,
        }
    }

    /// Get the default config directory path
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("attune"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Load configuration from file
    ///
    /// A missing file yields (and persists) the factory default. A corrupt
    /// file is backed up as `config.toml.corrupt` and replaced with the
    /// default in memory.
    #[instrument(skip(self))]
    pub async fn load(&self) -> AttuneConfig {
        if !self.config_path.exists() {
            info!(
                path = %self.config_path.display(),
                "Config file not found, creating factory default"
            );

            let config = AttuneConfig::default();
            if let Err(e) = config.save_to_file(&self.config_path).await {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to save factory default config"
                );
            }
            return config;
        }

        match AttuneConfig::load_from_file(&self.config_path).await {
            Ok(config) => config,
            Err(e) => {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load config, using factory default"
                );

                let backup_path = self.config_path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(&self.config_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                AttuneConfig::default()
            }
        }
    }

    /// Save configuration to file
    #[instrument(skip(self, config))]
    pub async fn save(&self, config: &AttuneConfig) -> Result<()> {
        fs::create_dir_all(&self.config_dir).await?;
        config.save_to_file(&self.config_path).await
    }
}

/// File system watcher for the profile directory
///
/// Broadcasts the path of any created or modified `.txt` profile so
/// consumers can refresh their model lists. The engine itself re-reads
/// profiles on every apply, so no invalidation is needed there.
pub struct ProfileWatcher {
    _watcher: notify::RecommendedWatcher,
    changed_tx: broadcast::Sender<PathBuf>,
}

impl ProfileWatcher {
    pub async fn new(profile_dir: PathBuf) -> Result<Self> {
        use notify::Watcher;

        let (changed_tx, _changed_rx) = broadcast::channel(32);

        fs::create_dir_all(&profile_dir).await?;

        let tx_clone = changed_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    notify::EventKind::Create(_) | notify::EventKind::Modify(_)
                ) {
                    for path in event.paths {
                        if path.extension().and_then(|e| e.to_str()) == Some("txt") {
                            if let Err(e) = tx_clone.send(path) {
                                error!("Failed to send profile change event: {}", e);
                            }
                        }
                    }
                }
            }
        })?;

        watcher.watch(&profile_dir, notify::RecursiveMode::NonRecursive)?;

        info!(path = %profile_dir.display(), "Profile watcher started");

        Ok(Self {
            _watcher: watcher,
            changed_tx,
        })
    }

    /// Subscribe to profile change events
    pub fn subscribe(&self) -> broadcast::Receiver<PathBuf> {
        self.changed_tx.subscribe()
    }
}
