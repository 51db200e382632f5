//! Aether - live CPU/RAM gauges with model-based usage warnings
//!
//! Samples host utilisation once per tick, buckets it, predicts near-future
//! usage with a pre-trained artifact and warns once per gauge view when the
//! prediction crosses its threshold.

mod commands;
mod config;
mod output;

use aether_lib::health::{components, HealthRegistry};
use aether_lib::{GaugeKind, PipelineMetrics, StructuredLogger};
use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, users, watch, App};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Aether resource monitor
#[derive(Parser)]
#[command(name = "aether")]
#[command(author, version, about = "Live CPU/RAM gauges with usage prediction warnings", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML or JSON); defaults to the user config dir
    #[arg(long, global = true, env = "AETHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new user
    Signup {
        #[arg(long)]
        name: String,

        #[arg(long)]
        lastname: String,

        #[arg(long)]
        email: String,
    },

    /// Sign in with a registered email
    Signin {
        #[arg(long)]
        email: String,
    },

    /// List registered users
    Users,

    /// Open a live gauge view
    Watch {
        /// Gauge to show (cpu or ram)
        gauge: GaugeKind,

        /// Close the view after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Email of the signed-in user
        #[arg(long)]
        email: Option<String>,

        /// Print Prometheus metrics when the view closes
        #[arg(long)]
        dump_metrics: bool,
    },

    /// Sample once and print readings, buckets and predictions
    Predict,
}

fn default_log_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

/// Explicit `--config`, else `<config dir>/aether/config.toml` when present
fn resolve_config_file(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        dirs_next::config_dir()
            .map(|dir| dir.join("aether").join("config.toml"))
            .filter(|path| path.is_file())
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_file = resolve_config_file(cli.config);
    let config = config::AppConfig::load(config_file.as_deref())?;
    info!(
        config_file = ?config_file,
        model_dir = %config.model_dir.display(),
        users_file = %config.users_file.display(),
        "Configuration loaded"
    );

    let health = HealthRegistry::new();
    health.register(components::SAMPLER).await;
    health.register(components::PREDICTOR).await;

    let logger = StructuredLogger::new(hostname());
    logger.log_startup(APP_VERSION);

    let app = App {
        config,
        format: cli.format,
        health,
        metrics: PipelineMetrics::new(),
        logger,
    };

    let result = match cli.command {
        Commands::Signup {
            name,
            lastname,
            email,
        } => users::sign_up(&app, &name, &lastname, &email).await,
        Commands::Signin { email } => users::sign_in(&app, &email).await,
        Commands::Users => users::list_users(&app).await,
        Commands::Watch {
            gauge,
            ticks,
            email,
            dump_metrics,
        } => {
            watch::watch(
                &app,
                watch::WatchOptions {
                    gauge,
                    ticks,
                    email,
                    dump_metrics,
                },
            )
            .await
        }
        Commands::Predict => predict::predict_once(&app).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        app.logger.log_shutdown("command failed");
        std::process::exit(1);
    }
    app.logger.log_shutdown("command completed");
    Ok(())
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(false), "info");
        assert_eq!(default_log_level(true), "debug");
    }

    #[test]
    fn test_cli_parses_watch() {
        let cli = Cli::try_parse_from(["aether", "--format", "json", "watch", "mem", "--ticks", "3"])
            .unwrap();
        assert_eq!(cli.format, output::OutputFormat::Json);
        match cli.command {
            Commands::Watch { gauge, ticks, .. } => {
                assert_eq!(gauge, GaugeKind::Ram);
                assert_eq!(ticks, Some(3));
            }
            _ => panic!("expected watch"),
        }
    }
}
