use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pm25viz::{
    clock::ManualClock,
    config::ConfigLoader,
    engine::{EngineBuilder, KeySchedule},
    web::{self, WebServerConfig},
    SeverityTier,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "PM2.5 particle visualization")]
struct Cli {
    /// Path to the visualization config YAML file
    #[arg(long, global = true, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate headlessly against a manual clock and print a summary
    Run {
        /// Simulated wall time in milliseconds
        #[arg(long, default_value_t = 30_000)]
        duration_ms: u64,

        /// Clock increment per poll in milliseconds
        #[arg(long, default_value_t = 100)]
        step_ms: u64,

        /// Override the starting concentration
        #[arg(long)]
        concentration: Option<f64>,

        /// Key presses as KEY@MILLIS, comma separated (e.g. 3@2000,5@4000)
        #[arg(long, default_value = "")]
        keys: String,
    },
    /// Serve the live visualization over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8000)]
        port: u16,

        /// Scheduler poll interval in milliseconds
        #[arg(long, default_value_t = 50)]
        poll_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = ConfigLoader::new(".").load(&cli.config)?;

    match cli.command {
        Command::Run {
            duration_ms,
            step_ms,
            concentration,
            keys,
        } => {
            if let Some(value) = concentration {
                config.current_value = value;
                config.validate()?;
            }
            let keys = KeySchedule::parse(&keys)?;
            let mut engine = EngineBuilder::new(config).build(ManualClock::default());
            let summary = engine.run_with_hook(
                Duration::from_millis(duration_ms),
                Duration::from_millis(step_ms),
                &keys,
                |_| {},
            )?;
            let reading = engine.manager().concentration().get();
            let tier = SeverityTier::classify(reading);
            println!(
                "'{}' simulated {} ms. Reading: {} µg/m³ ({}, {}). Spawned {}, evicted {}, peak {}, final {}.",
                engine.name(),
                duration_ms,
                reading,
                tier.label(),
                tier.color(),
                summary.spawned,
                summary.evicted,
                summary.peak_population,
                summary.final_population
            );
            engine.stop();
        }
        Command::Serve {
            host,
            port,
            poll_ms,
        } => {
            web::run(WebServerConfig {
                config,
                host,
                port,
                poll_interval: Duration::from_millis(poll_ms.max(1)),
            })
            .await?;
        }
    }
    Ok(())
}
