//! Attune CLI Application

use std::path::PathBuf;

use attune_core::domain::audio::AudioEnumerator;
use attune_core::domain::config::ConfigManager;
use attune_core::domain::profile::{ProfileLibrary, ProfileSource};
use attune_core::domain::DeviceId;
use attune_infra::audio::CpalEnumerator;
use attune_infra::EqService;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "attune")]
#[command(about = "Differential headphone EQ for the live audio path", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Profile directory (defaults to the configured one)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List selectable output devices
    Devices,
    /// List headphone models available in the profile library
    Profiles,
    /// Parse one profile and print its bands
    Show {
        /// Headphone model name
        model: String,
    },
    /// Apply EQ correction to the live audio path until interrupted
    Apply {
        /// Your headphone model
        #[arg(long)]
        profile: String,

        /// Target headphone model for a differential correction
        #[arg(long)]
        target: Option<String>,

        /// Output device id (defaults to the system default output)
        #[arg(long)]
        device: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "attune=debug,info" } else { "attune=info,warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config_dir = ConfigManager::default_config_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = ConfigManager::new(config_dir).load().await;
    let profile_dir = cli.dir.clone().unwrap_or(config.app.profile_dir.clone());

    match cli.command {
        Command::Devices => {
            let enumerator = CpalEnumerator::new();
            match enumerator.output_endpoints() {
                Ok(endpoints) if endpoints.is_empty() => println!("No output devices found."),
                Ok(endpoints) => {
                    for endpoint in endpoints {
                        println!(
                            "{}  ({} ch{})",
                            endpoint.name,
                            endpoint.max_output_channels,
                            endpoint
                                .default_sample_rate
                                .map(|r| format!(", {} Hz", r.hz()))
                                .unwrap_or_default(),
                        );
                    }
                }
                Err(e) => println!("Device enumeration failed: {}", e),
            }
        }

        Command::Profiles => {
            let library = ProfileLibrary::new(profile_dir);
            let models = library.list_models().await?;
            if models.is_empty() {
                println!("No profiles found in {}", library.profile_dir().display());
            } else {
                for model in models {
                    println!("{}", model);
                }
            }
        }

        Command::Show { model } => {
            let library = ProfileLibrary::new(profile_dir);
            let parsed = library.load(&model).await?;
            println!("Preamp: {:+.1} dB", parsed.profile.preamp_db);
            for (i, band) in parsed.profile.bands.iter().enumerate() {
                println!(
                    "{:>2}. {:?} Fc {:.0} Hz Gain {:+.1} dB Q {:.2}",
                    i + 1,
                    band.kind,
                    band.center_frequency_hz,
                    band.gain_db,
                    band.q_factor,
                );
            }
            if !parsed.skipped.is_empty() {
                println!("({} line(s) skipped)", parsed.skipped.len());
            }
        }

        Command::Apply {
            profile,
            target,
            device,
        } => {
            let output = match device {
                Some(id) => DeviceId::new(id),
                None => {
                    let enumerator = CpalEnumerator::new();
                    enumerator.default_output_device()?.id
                }
            };

            let mut service = EqService::new(profile_dir, config.app.buffer_size);
            let outcome = service
                .apply_eq_settings(&profile, target.as_deref(), &output)
                .await?;
            println!("{}", outcome);
            println!("Press Ctrl-C to stop.");

            tokio::signal::ctrl_c().await?;

            service.stop_eq_settings();
            println!("EQ settings have been stopped.");
        }
    }

    Ok(())
}
