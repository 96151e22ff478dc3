//! Math notes server
//!
//! Serves the notes index, categorized drive listings and a same-origin PDF
//! proxy over HTTP.

mod config;
mod drive;
mod error;
mod http;
mod notes;
mod proxy;

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use config::Config;
use drive::{DriveProvider, ListingCache};
use http::AppState;
use notes::NoteIndexCache;
use proxy::{FetchPolicy, FetchProxy};

/// CLI command
#[derive(Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve { config_path: Option<PathBuf> },
    /// Scan the notes tree and print the index (CLI mode)
    Scan { config_path: Option<PathBuf> },
    /// Show help
    Help,
}

fn print_help() {
    eprintln!(
        r#"Math notes server - notes index, drive listings and PDF proxy

USAGE:
    mathnotes-server [serve] [config.json]
    mathnotes-server scan [config.json]
    mathnotes-server help

COMMANDS:
    serve   Run the HTTP server (default)
    scan    Scan the notes tree and print the note ids (CLI mode)
    help    Show this help message

ENVIRONMENT:
    PORT             HTTP port (overrides the config file)
    NOTES_ROOT       Root directory of the notes tree
    DRIVE_API_KEY    Google Drive API key for listings
    RUST_LOG         Log level (trace, debug, info, warn, error)
"#
    );
}

fn parse_args() -> Command {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None => Command::Serve { config_path: None },
        Some("serve") => Command::Serve {
            config_path: args.get(2).map(PathBuf::from),
        },
        Some("scan") => Command::Scan {
            config_path: args.get(2).map(PathBuf::from),
        },
        Some("help") | Some("--help") | Some("-h") => Command::Help,
        Some(other) => {
            // A bare path argument means "serve with this config"
            if other.ends_with(".json") {
                Command::Serve {
                    config_path: Some(PathBuf::from(other)),
                }
            } else {
                eprintln!("Unknown command: {other}");
                Command::Help
            }
        }
    }
}

/// Build the shared application state from configuration
fn build_state(config: &Config) -> Result<AppState> {
    let notes = Arc::new(NoteIndexCache::new(config.notes_root.clone()));

    let provider = DriveProvider::new(config.drive_api_key.clone())
        .context("Failed to create drive provider")?;
    let listings = Arc::new(ListingCache::new(
        Box::new(provider),
        config.categories.clone(),
        config.listing_ttl(),
    ));

    let policy = FetchPolicy::new(
        config.allowed_hosts.clone(),
        config.static_prefix.clone(),
        config.proxy_timeout(),
    );
    let fetch_proxy = Arc::new(FetchProxy::new(policy)?);

    Ok(AppState {
        notes,
        listings,
        proxy: fetch_proxy,
    })
}

async fn serve(config: Config) -> Result<()> {
    let state = build_state(&config)?;
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!(
        addr = %config.bind_addr,
        notes_root = %config.notes_root.display(),
        categories = config.categories.len(),
        "HTTP server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await
        .context("HTTP server error")?;

    info!("Shutdown complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let log_level = env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match parse_args() {
        Command::Serve { config_path } => {
            let config = Config::load(config_path.as_deref())?;
            serve(config).await?;
        }
        Command::Scan { config_path } => {
            let config = Config::load(config_path.as_deref())?;
            let scan = notes::scanner::scan(&config.notes_root);
            if scan.ids.is_empty() {
                println!("No notes found under {}", config.notes_root.display());
            } else {
                for id in &scan.ids {
                    println!("{id}");
                }
                println!("{} notes", scan.ids.len());
            }
        }
        Command::Help => {
            print_help();
        }
    }

    Ok(())
}
