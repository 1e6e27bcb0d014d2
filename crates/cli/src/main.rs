//! upd CLI
//!
//! A command-line interface for uploading to and managing an upd server.

mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};
use upd_client::{UpdClient, UpdClientBuilder};

/// upd CLI: share files through an upd server.
#[derive(Parser, Debug)]
#[command(name = "upd", version, about)]
struct Cli {
    /// Server URL, including any route prefix.
    #[arg(
        long,
        env = "UPD_SERVER",
        default_value = "http://localhost:9000",
        global = true
    )]
    server: String,

    /// Shared secret sent in the `X-upd-key` header.
    #[arg(long, env = "UPD_KEY", global = true, hide_env_values = true)]
    key: Option<String>,

    /// HTTPS trust: a PEM CA bundle path, or `unsafe` to skip verification.
    #[arg(long, global = true)]
    ca: Option<String>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload one or more files.
    Send(commands::send::SendArgs),
    /// Find files by tag.
    Search(commands::search::SearchArgs),
    /// List the most recent uploads.
    List,
    /// Download a file.
    Get(commands::get::GetArgs),
    /// Delete a file with its delete key.
    Delete(commands::delete::DeleteArgs),
    /// Check that the server accepts the secret key.
    AuthCheck,
    /// Check server health.
    Health,
}

fn build_client(cli: &Cli) -> anyhow::Result<UpdClient> {
    let mut builder = UpdClientBuilder::new(&cli.server);
    if let Some(key) = &cli.key {
        builder = builder.secret_key(key);
    }
    match cli.ca.as_deref() {
        None | Some("" | "none") => {}
        Some("unsafe") => builder = builder.danger_accept_invalid_certs(true),
        Some(path) => {
            let path = PathBuf::from(path);
            let pem = std::fs::read(&path)
                .with_context(|| format!("cannot read CA bundle {}", path.display()))?;
            builder = builder.ca_bundle(pem);
        }
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = build_client(&cli)?;

    match &cli.command {
        Command::Send(args) => commands::send::run(&client, args, &cli.format).await,
        Command::Search(args) => commands::search::run(&client, args, &cli.format).await,
        Command::List => commands::list::run(&client, &cli.format).await,
        Command::Get(args) => commands::get::run(&client, args).await,
        Command::Delete(args) => commands::delete::run(&client, args).await,
        Command::AuthCheck => commands::auth_check::run(&client, &cli.format).await,
        Command::Health => commands::health::run(&client).await,
    }
}
