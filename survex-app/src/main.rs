//! survex - runs the survey server, or performs the one-time spreadsheet
//! authorization that writes the token file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use survex_app::{AppConfig, AppState, build_router, spawn_session_sweeper};
use survex_cache::SessionCache;
use survex_experiment::VideoCatalog;
use survex_submit::{OAuthClient, SubmissionAdapter, http_client};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "survex")]
#[command(about = "Video classification survey server")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "SURVEX_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the survey web server (the default)
    Serve(ServeArgs),
    /// Grant spreadsheet access once and write the token file
    Authorize,
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory scanned for videos
    #[arg(long)]
    video_dir: Option<PathBuf>,

    /// Spreadsheet receiving one row per participant
    #[arg(long)]
    spreadsheet_id: Option<String>,
}

impl ServeArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = self.video_dir {
            config.experiment.video_dir = dir;
        }
        if let Some(id) = self.spreadsheet_id {
            config.sheets.spreadsheet_id = Some(id);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting survex v{}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => {
            args.apply(&mut config);
            serve(config).await
        }
        Command::Authorize => authorize(config).await,
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    config.experiment.warn_on_unusual_settings();

    let catalog = VideoCatalog::from_config(&config.experiment);
    info!(
        "Found {} videos in {}",
        catalog.len(),
        catalog.root().display()
    );

    let submitter = SubmissionAdapter::from_config(&config.sheets)
        .await
        .context("Failed to set up response submission")?;
    info!("Responses go to {}", submitter.sink_name());

    let sessions = SessionCache::new(config.session.max_sessions, config.session.idle_timeout());
    let state = AppState::new(
        catalog,
        config.experiment.choices.clone(),
        submitter,
        sessions,
        &config.server.title,
    );
    let sweeper = spawn_session_sweeper(Arc::clone(&state.sessions), config.session.sweep_interval());
    let app = build_router(state);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Survey running on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server shut down");
    Ok(())
}

async fn authorize(config: AppConfig) -> Result<()> {
    let http = http_client(Duration::from_secs(config.sheets.timeout_secs))?;
    let oauth = OAuthClient::new(&config.sheets, http);
    let url = oauth
        .authorization_url()
        .context("Set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET (or a .env file) first")?;

    println!("Open this URL in a browser and grant access:\n\n{url}\n");
    println!("Paste the authorization code and press Enter:");
    let mut code = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut code)
        .await
        .context("Failed to read authorization code")?;

    let user = oauth.exchange_code(code.trim()).await?;
    user.write(&config.sheets.token_path).await?;
    info!("Token written to {}", config.sheets.token_path.display());
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
