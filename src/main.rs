use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pingboard::config::{LogFormat, LoggingConfig, PingboardConfig};
use pingboard::probes::{HttpProber, Prober, Target};

#[derive(Parser)]
#[command(
    name = "pingboard",
    about = "Periodic URL health checks with bounded in-memory history",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (check loops + status API)
    Serve {
        /// Path to the TOML configuration file
        #[arg(long, env = "PINGBOARD_CONFIG", default_value = "pingboard.toml")]
        config: PathBuf,

        /// Override the configured listen address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Probe a single URL once and print the result
    Check {
        /// URL to probe
        url: String,

        /// Request timeout in milliseconds
        #[arg(long, default_value = "5000", value_parser = clap::value_parser!(u64).range(1..))]
        timeout_ms: u64,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Load and validate a configuration file without starting anything
    ValidateConfig {
        /// Path to the TOML configuration file
        #[arg(long, env = "PINGBOARD_CONFIG", default_value = "pingboard.toml")]
        config: PathBuf,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    // stdout is reserved for command output.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => {
            let mut cfg = PingboardConfig::load(&config)?;
            if let Some(bind) = bind {
                cfg.server.listen_address = bind;
            }
            init_tracing(&cfg.logging);
            tracing::info!(
                path = %config.display(),
                targets = cfg.targets.len(),
                "loaded configuration"
            );
            tracing::info!("starting pingboard daemon");
            pingboard::serve(cfg, shutdown_signal()).await?;
        }
        Commands::Check {
            url,
            timeout_ms,
            json,
        } => {
            init_tracing(&LoggingConfig::default());
            let target = Target::parse(&url, None)?;
            let prober = HttpProber::new(Duration::from_millis(timeout_ms))?;
            let result = prober.check(&target).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("\n=== pingboard check ===");
                println!("URL:      {}", target.url());
                println!("Result:   {}", if result.success { "UP" } else { "DOWN" });
                println!(
                    "Status:   {}",
                    result
                        .status_code
                        .map_or_else(|| "-".to_string(), |c| c.to_string())
                );
                println!("Latency:  {:.1} ms", result.latency_ms);
                if let Some(err) = &result.error {
                    println!("Error:    {}", err);
                }
                println!("=======================\n");
            }

            if !result.success {
                std::process::exit(2);
            }
        }
        Commands::ValidateConfig { config } => {
            init_tracing(&LoggingConfig::default());
            let cfg = PingboardConfig::load(&config)?;
            tracing::info!(path = %config.display(), "loaded configuration");
            let settings = cfg.settings()?;
            println!("Configuration OK: {}", config.display());
            println!("  targets:          {}", cfg.targets.len());
            println!("  interval:         {:?}", settings.interval);
            println!("  history capacity: {}", settings.history_capacity);
            println!("  probe timeout:    {:?}", cfg.probe_timeout()?);
            println!("  listen address:   {}", cfg.listen_address()?);
        }
    }

    Ok(())
}
