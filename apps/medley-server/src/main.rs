use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use medley_bootstrap::{AppConfig, CliArgs};
use medley_discovery::{DiscoveredItem, DiscoveryRegistry, FactoryResolver, ItemSink};

// Ensure provider crates are linked so their inventory registrations exist.
#[allow(dead_code)]
fn _ensure_providers_linked() {
    let _ = folder_scan::PROVIDER_NAME;
    let _ = static_channels::PROVIDER_NAME;
}

/// Medley Server - media library daemon with pluggable discovery providers
#[derive(Parser)]
#[command(name = "medley-server")]
#[command(about = "Medley Server - media library daemon")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Discovery providers to load, `:`-separated (overrides config)
    #[arg(short = 's', long)]
    providers: Option<String>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

/// The daemon's item intake: every announcement from a provider worker is
/// logged. A richer playlist backend plugs in here.
struct LogSink;

impl ItemSink for LogSink {
    fn announce(&self, item: DiscoveredItem) {
        tracing::info!(
            source = %item.source,
            uri = %item.uri,
            title = item.title.as_deref().unwrap_or(""),
            "discovered media item"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    _ensure_providers_linked();

    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        providers: cli.providers.clone(),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    medley_bootstrap::logging::init_logging(&logging_config, Path::new(&config.server.home_dir));

    tracing::info!("Medley Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    let resolver = Arc::new(
        FactoryResolver::discover(Arc::new(LogSink)).with_configs(config.providers.clone()),
    );
    tracing::info!(factories = ?resolver.factory_names(), "discovery providers available");

    let registry = Arc::new(DiscoveryRegistry::new(resolver));

    // Bulk-load the configured provider list. Worker joins and provider
    // construction can block, so registry calls stay off the async runtime.
    let provider_list = config.discovery.providers.clone();
    let report = {
        let registry = Arc::clone(&registry);
        tokio::task::spawn_blocking(move || registry.add_all(&provider_list)).await?
    };
    if !report.all_added() {
        tracing::warn!(
            failed = report.failures.len(),
            "some discovery providers failed to load"
        );
    }
    tracing::info!(loaded = ?registry.loaded_names(), "discovery running");

    medley_bootstrap::signals::wait_for_shutdown().await?;

    let registry = Arc::clone(&registry);
    tokio::task::spawn_blocking(move || registry.shutdown()).await?;

    tracing::info!("Medley Server stopped");
    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}
