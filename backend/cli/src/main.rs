mod catalog;
mod check_config_cmd;
mod commands_cmd;
mod config;
mod general;
mod terminal_output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use axum::http::StatusCode;
use axum::Router;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use parley_commands::{
    CommandCatalog, CommandHandlerCache, CommandsRegistrar, DeclarationLoader, ServiceCollection, ServiceProvider,
};
use parley_config::{config_dir, config_file_path, load_and_prepare, ValidationReport};
use parley_gateway::{start_server, InteractionsGateway, SignatureVerifier};
use parley_logging::init_logger;

use catalog::{DiscordCatalog, UnconfiguredCatalog};
use config::Settings;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley: Discord interactions webhook gateway")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $PARLEY_CONFIG_DIR/parley.yaml or ~/.parley/parley.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactions gateway
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Validate the config file and print it with secrets masked
    CheckConfig {
        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
    /// Build the declared commands and list them per partition, without registering
    Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        Commands::CheckConfig { json } => {
            if !check_config_cmd::run(&path, json).await? {
                std::process::exit(1);
            }
        }
        Commands::Commands => {
            let (settings, _) = load_settings(&path).await?;
            let services = build_services();
            let registrar = build_registrar(&settings, services, Arc::new(CommandHandlerCache::new()));
            if !commands_cmd::run(&registrar).await? {
                std::process::exit(1);
            }
        }
        Commands::Serve { port } => {
            let (mut settings, report) = load_settings(&path).await?;
            if !report.is_valid() {
                bail!(
                    "Config {} has {} error(s); run `parley check-config` for details",
                    path.display(),
                    report.errors.len()
                );
            }
            if let Some(port) = port {
                settings.port = port;
            }
            run_server(settings).await?;
        }
    }

    Ok(())
}

/// Load the config, install logging from it, then report validation findings.
async fn load_settings(path: &Path) -> Result<(Settings, ValidationReport)> {
    let (config, report) = load_and_prepare(path).await?;
    let settings = Settings::from_config(&config);
    init_logger(&settings.logging)?;
    report.log();
    Ok((settings, report))
}

fn build_services() -> ServiceProvider {
    let mut services = ServiceCollection::new();
    services.add_instance(Arc::new(general::Uptime::new()));
    services.add_singleton(|_| Ok(general::SayLimits::default()));
    services.build()
}

fn build_registrar(settings: &Settings, services: ServiceProvider, cache: Arc<CommandHandlerCache>) -> CommandsRegistrar {
    let mut options = settings.registrar.clone();
    let catalog: Arc<dyn CommandCatalog> = match (&settings.bot_token, settings.application_id) {
        (Some(token), Some(application_id)) => Arc::new(DiscordCatalog::new(
            &settings.api_base_url,
            application_id,
            token.clone(),
        )),
        _ => {
            if options.enabled {
                warn!("Command registration disabled: discord.botToken and discord.applicationId are required");
                options.enabled = false;
            }
            Arc::new(UnconfiguredCatalog)
        }
    };

    let loader = DeclarationLoader::default().with_module(general::module());
    CommandsRegistrar::new(options, loader, services, catalog, cache)
}

async fn run_server(settings: Settings) -> Result<()> {
    let addr = settings.addr()?;
    info!(
        port = settings.port,
        bind = %settings.bind,
        routes = ?settings.gateway.routes,
        "Starting parley gateway"
    );

    let verifier = SignatureVerifier::from_hex(&settings.public_key).context("Invalid discord.publicKey")?;
    let services = build_services();
    let cache = Arc::new(CommandHandlerCache::new());
    let registrar = Arc::new(build_registrar(&settings, services.clone(), cache.clone()));

    let shutdown = CancellationToken::new();

    let registration = {
        let registrar = registrar.clone();
        let cancel = shutdown.child_token();
        tokio::spawn(async move {
            match registrar.run(&cancel).await {
                Ok(report) if !report.is_success() => {
                    warn!(partitions = ?report.partitions, "Some command partitions were not registered")
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Command registration failed"),
            }
        })
    };

    let gateway = InteractionsGateway::new(settings.gateway.clone(), verifier, cache.clone(), services)
        .with_registration(registrar.subscribe());
    let app = gateway
        .mount(Router::new().fallback(|| async { StatusCode::NOT_FOUND }))
        .layer(TraceLayer::new_for_http());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                signal.cancel();
            }
            Err(e) => warn!(error = %e, "Unable to listen for the shutdown signal"),
        }
    });

    let served = start_server(addr, app, shutdown.clone()).await;
    shutdown.cancel();
    if let Err(e) = registration.await {
        warn!(error = %e, "Registration task ended abnormally");
    }
    cache.dispose();
    served
}
