use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use upd_engine::{EngineBuilder, ExpirySweeperBuilder, SweeperConfig};
use upd_server::api::AppState;
use upd_server::auth::SharedSecret;
use upd_server::config::UpdConfig;
use upd_server::factory::{create_blob_backend, create_record_store};

/// upd ephemeral file hosting server.
#[derive(Parser, Debug)]
#[command(name = "upd-server", about = "HTTP server for upd")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "upd.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate the configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config, found) = UpdConfig::load(Path::new(&cli.config))?;

    if let Some(Commands::CheckConfig) = cli.command {
        return check_config(&config, &cli.config, found).await;
    }

    let telemetry_guard = upd_server::telemetry::init(&config.telemetry);
    if !found {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    let blobs = create_blob_backend(&config.storage).await?;
    let records = create_record_store(&config.records).await?;
    let engine = Arc::new(EngineBuilder::new().blobs(blobs).records(records).build()?);

    // Refuse to start against records written for a different medium.
    engine.bind_medium().await?;
    let backend = engine.backend_info();
    info!(kind = %backend.kind, locator = %backend.locator, "storage medium bound");

    let sweeper_shutdown = if config.background.enabled {
        let (mut sweeper, shutdown_tx) = ExpirySweeperBuilder::new()
            .engine(Arc::clone(&engine))
            .config(SweeperConfig {
                interval: Duration::from_secs(config.background.sweep_interval_seconds),
            })
            .build()?;
        let handle = tokio::spawn(async move { sweeper.run().await });
        Some((shutdown_tx, handle))
    } else {
        info!("expiry sweeper disabled, expired files are retired on access only");
        None
    };

    let mut state = AppState::new(Arc::clone(&engine));
    state.secret = SharedSecret::new(&config.server.secret_key);
    state.route_prefix = config.server.route_prefix();
    state.max_upload_bytes = config.server.max_upload_bytes;
    if state.secret.is_disabled() {
        warn!("no secret key configured, upload and listing routes are open");
    }
    let app = upd_server::api::router(state);

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if config.tls.enabled {
        let tls_config = upd_server::tls::build_server_config(&config.tls)?;
        info!(address = %addr, "upd-server listening (TLS)");
        upd_server::tls::serve_tls(listener, tls_config, app, shutdown_signal()).await?;
    } else {
        info!(address = %addr, "upd-server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    }

    if let Some((shutdown_tx, handle)) = sweeper_shutdown {
        let _ = shutdown_tx.send(()).await;
        let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
        if tokio::time::timeout(shutdown_timeout, handle).await.is_err() {
            warn!(
                timeout_secs = config.server.shutdown_timeout_seconds,
                "shutdown timeout exceeded, expiry sweep abandoned"
            );
        }
    }

    telemetry_guard.shutdown();

    info!("upd-server shut down");
    Ok(())
}

/// Run the `check-config` subcommand: open both stores and compare the
/// record store's medium with the configured backend, without binding it.
async fn check_config(
    config: &UpdConfig,
    path: &str,
    found: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let blobs = create_blob_backend(&config.storage).await?;
    let records = create_record_store(&config.records).await?;
    let configured = blobs.info();

    match records.medium().await? {
        Some(stored) if stored != configured.kind.as_str() => {
            return Err(format!(
                "record store was created for {stored}, configuration uses {}",
                configured.kind
            )
            .into());
        }
        Some(_) => println!("medium: {} (bound)", configured.kind),
        None => println!("medium: {} (not yet bound)", configured.kind),
    }
    println!("storage: {configured}");
    if found {
        println!("{path}: ok");
    } else {
        println!("{path}: not found, defaults are valid");
    }
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
