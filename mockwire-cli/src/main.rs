//! mockwire CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use mockwire_config::{load_config, Config, LogFormat};
use mockwire_core::MockDefinition;
use mockwire_registry::MockRegistry;
use mockwire_router::Router;
use mockwire_runtime::{registry_options, script_limits, MockServer, SignalHandler};
use mockwire_scripting::RhaiEngine;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "mockwire")]
#[command(about = "Scriptable HTTP and gRPC mock server", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the mocks
    Serve {
        /// Path to configuration file
        #[arg(short, long, env = "MOCKWIRE_CONFIG")]
        config: Option<PathBuf>,

        /// Log level (trace, debug, info, warn, error); overrides the config
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Validate configuration, schemas and scripts
    Validate {
        /// Path to configuration file
        #[arg(short, long, env = "MOCKWIRE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// List every served HTTP route and gRPC method
    Routes {
        /// Path to configuration file
        #[arg(short, long, env = "MOCKWIRE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, log_level } => {
            let config = load_config(config.as_deref())?;
            let level = log_level.unwrap_or_else(|| config.log.level.clone());
            init_tracing(&level, config.log.format)?;

            tracing::info!(
                http = config.http.enabled,
                grpc = config.grpc.enabled,
                "Configuration loaded"
            );

            let server = MockServer::build(config)?;

            let shutdown_signal = server.shutdown_signal();
            tokio::spawn(async move {
                let handler = SignalHandler::new(shutdown_signal);
                handler.run().await;
            });

            server.run().await?;
            Ok(())
        }

        Commands::Validate { config } => {
            init_tracing("warn", LogFormat::Text)?;

            match validate(config.as_deref()) {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("✗ Validation failed: {e:#}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Routes { config } => {
            init_tracing("warn", LogFormat::Text)?;

            let config = load_config(config.as_deref())?;
            let registry = MockRegistry::load(&registry_options(&config))?;

            if config.http.enabled {
                println!("HTTP ({})", config.http.listen);
                let router = Router::from_mocks(registry.http_mocks())?;
                for route in router.routes() {
                    println!(
                        "  {:<7} {:<40} {}",
                        route.method,
                        route.path,
                        route.mock.source_path.display()
                    );
                }
            }

            if config.grpc.enabled {
                println!("gRPC ({})", config.grpc.listen);
                let mut methods: Vec<_> = registry.grpc_mocks().iter().collect();
                methods.sort_by_key(|m| m.path());
                for method in methods {
                    println!(
                        "  {:<48} {}",
                        method.path(),
                        method.definition.source_path.display()
                    );
                }
            }

            Ok(())
        }

        Commands::Version => {
            println!("mockwire");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

fn validate(path: Option<&Path>) -> Result<()> {
    let config: Config = load_config(path)?;
    println!("✓ Configuration is valid");

    let registry = MockRegistry::load(&registry_options(&config))?;
    if config.http.enabled {
        Router::from_mocks(registry.http_mocks())?;
    }

    let engine = RhaiEngine::new(script_limits(&config));
    let scripts = registry
        .http_mocks()
        .iter()
        .map(|m| m.as_ref())
        .chain(registry.grpc_mocks().iter().map(|m| m.definition.as_ref()));

    let mut failures = 0usize;
    for mock in scripts {
        if let Err(e) = check_script(&engine, mock) {
            failures += 1;
            eprintln!("✗ {} ({}): {}", mock.name(), mock.source_path.display(), e);
        }
    }

    if let Some(schema) = registry.schema() {
        println!("  Schema files: {}", schema.files().len());
        println!("  Services: {}", schema.services().count());
    }
    println!("  HTTP routes: {}", registry.http_mocks().len());
    println!("  gRPC methods: {}", registry.grpc_mocks().len());

    if failures > 0 {
        anyhow::bail!("{failures} script(s) failed to compile");
    }

    println!("✓ All scripts compile");
    Ok(())
}

fn check_script(engine: &RhaiEngine, mock: &MockDefinition) -> Result<()> {
    engine.check(&mock.script)?;
    Ok(())
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_current_span(true)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(false)))
        .init();

    Ok(())
}
