//! Storybook CLI
//!
//! Main entry point for serving the storybook generator.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use storybook_gemini::GeminiClient;
use storybook_orchestrator::{create_router, AppState, Config, API_KEY_ENV, SECRET_KEY_ENV};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Default port for the HTTP server.
const DEFAULT_PORT: u16 = 5000;

/// Default bind address.
const DEFAULT_HOST: &str = "0.0.0.0";

/// Storybook Generator
///
/// Serves a web form that turns a character description and optional photos
/// into an illustrated ten-page children's storybook.
#[derive(Parser, Debug)]
#[command(name = "storybook")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: storybook.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Directory where generated storybooks are stored
    #[arg(short, long, value_name = "DIR")]
    storage_dir: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port for the HTTP server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Storybook generator starting");
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    match run_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Loads configuration, prepares directories and serves until Ctrl+C.
async fn run_server(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;
    let config = config.with_env();

    config.prepare_directories()?;
    print_config(&config);

    if config.uses_default_secret() {
        tracing::warn!(
            "{SECRET_KEY_ENV} is not set; using the built-in development secret"
        );
    }
    if config.api_key.is_none() {
        tracing::warn!(
            "{API_KEY_ENV} is not set; generation requests will fail until it is provided"
        );
    }

    let client = GeminiClient::new(config.api_key.as_ref().map(|key| key.expose().to_string()))
        .with_base_url(config.api_base_url.clone());
    let router = create_router(AppState::new(config, Arc::new(client)));

    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to bind to {}:{}: {e}\n\nSuggestion: Try a different port with --port",
                args.host,
                args.port
            )
        })?;
    let addr = listener.local_addr()?;

    println!();
    println!("Storybook generator running on http://{addr}");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Loads configuration from file.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Applies command-line overrides on top of the loaded configuration.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(ref storage_dir) = args.storage_dir {
        config.storage_dir.clone_from(storage_dir);
    }
}

/// Prints the loaded configuration summary.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Storage directory: {}", config.storage_dir);
    println!("  Upload directory: {}", config.upload_dir);
    println!("  Max request size: {} bytes", config.max_content_length);
    println!("  Story model: {}", config.story_model);
    println!("  Image model: {}", config.image_model);
    println!("  Default art style: {}", config.default_art_style);
}

/// Resolves when Ctrl+C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}
