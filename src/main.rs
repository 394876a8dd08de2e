//! appliance-configd: configuration daemon for the appliance management API.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use appliance_configd::http::HttpServer;
use appliance_configd::lifecycle::{self, Shutdown};
use appliance_configd::observability::{logging, metrics};
use appliance_configd::settings::load_settings_or_default;
use appliance_configd::system::SystemContext;

#[derive(Parser)]
#[command(name = "appliance-configd")]
#[command(about = "Configuration daemon for the appliance management API", long_about = None)]
struct Args {
    /// Daemon settings file (TOML).
    #[arg(short, long, default_value = "/etc/appliance-configd/configd.toml")]
    config: PathBuf,

    /// Log system commands instead of running them.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut settings = load_settings_or_default(&args.config)?;
    if args.dry_run {
        settings.commands.dry_run = true;
    }

    logging::init_tracing(&settings.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "appliance-configd starting");
    if !args.config.exists() {
        tracing::warn!(path = %args.config.display(), "Settings file not found, using defaults");
    }
    tracing::info!(
        bind_address = %settings.listener.bind_address,
        root = %settings.paths.root,
        state_dir = %settings.paths.state_dir,
        dry_run = settings.commands.dry_run,
        "Settings loaded"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let settings = Arc::new(settings);
    let system = SystemContext::from_settings(&settings);
    let state = lifecycle::build_state(Arc::clone(&settings), system).await?;

    let listener = TcpListener::bind(&settings.listener.bind_address).await?;
    let shutdown = Arc::new(Shutdown::new());
    lifecycle::spawn_signal_handler(Arc::clone(&shutdown));

    HttpServer::new(state).run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
