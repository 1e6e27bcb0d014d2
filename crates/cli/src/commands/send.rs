use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use futures::future::join_all;
use serde::Serialize;
use upd_client::{SendOptions, UpdClient};

use super::availability;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Files to upload.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Lifetime such as `30m` or `2h45m`; omitted means forever.
    #[arg(long)]
    pub ttl: Option<String>,
    /// Comma-separated tags.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    /// Publish the real filename instead of a generic one.
    #[arg(long)]
    pub keep_name: bool,
}

#[derive(Debug, Serialize)]
struct Uploaded {
    file: String,
    url: String,
    delete_url: String,
    expiration_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// The name announced to the server: the file's own name with
/// `--keep-name`, otherwise `file` plus the original extension.
fn upload_name(path: &Path, keep_name: bool) -> String {
    if keep_name && let Some(name) = path.file_name() {
        return name.to_string_lossy().into_owned();
    }
    match path.extension() {
        Some(ext) => format!("file.{}", ext.to_string_lossy()),
        None => "file".to_owned(),
    }
}

async fn upload(
    client: &UpdClient,
    path: &Path,
    options: &SendOptions,
    keep_name: bool,
) -> anyhow::Result<Uploaded> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let sent = client
        .send(&upload_name(path, keep_name), data, options)
        .await
        .with_context(|| format!("upload of {} failed", path.display()))?;
    Ok(Uploaded {
        file: path.display().to_string(),
        url: client.file_url(&sent.name),
        delete_url: client.delete_url(&sent.name, &sent.delete_key),
        expiration_time: sent.expiration_time,
    })
}

pub async fn run(client: &UpdClient, args: &SendArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let mut options = SendOptions::new().tags(args.tags.iter().map(|t| t.trim().to_owned()));
    if let Some(ttl) = args.ttl.as_deref().filter(|t| !t.is_empty()) {
        options = options.ttl(ttl);
    }

    let results = join_all(
        args.files
            .iter()
            .map(|path| upload(client, path, &options, args.keep_name)),
    )
    .await;

    let mut uploaded = Vec::new();
    let mut failures = 0usize;
    for result in results {
        match result {
            Ok(u) => uploaded.push(u),
            Err(e) => {
                failures += 1;
                eprintln!("{e:#}");
            }
        }
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&uploaded)?),
        OutputFormat::Text => {
            for u in &uploaded {
                println!("For file: {}", u.file);
                println!("URL: {}", u.url);
                println!("Delete URL: {}", u.delete_url);
                println!("{}", availability(u.expiration_time));
                println!("--");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} upload(s) failed", args.files.len());
    }
    Ok(())
}
