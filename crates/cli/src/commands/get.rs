use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Args;
use tokio::io::AsyncWriteExt;
use upd_client::UpdClient;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// File identifier.
    pub id: String,
    /// Destination path, or `-` for stdout. Defaults to the original filename,
    /// which is never overwritten.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Resize images to this width (requires --height).
    #[arg(long, requires = "height")]
    pub width: Option<u32>,
    /// Resize images to this height (requires --width).
    #[arg(long, requires = "width")]
    pub height: Option<u32>,
}

/// Where to write a download when no `--output` is given: the final
/// component of the original name, falling back to the identifier.
fn default_destination(original: Option<&str>, id: &str) -> PathBuf {
    original
        .and_then(|name| Path::new(name).file_name())
        .map_or_else(|| PathBuf::from(id), PathBuf::from)
}

/// Write `data` to `destination`. An existing file is replaced only when
/// `overwrite` is set.
async fn save(destination: &Path, data: &[u8], overwrite: bool) -> anyhow::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut file = match options.open(destination).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => bail!(
            "{} already exists, pass -o to choose where to save",
            destination.display()
        ),
        Err(e) => {
            return Err(e).with_context(|| format!("cannot write {}", destination.display()));
        }
    };
    file.write_all(data)
        .await
        .with_context(|| format!("cannot write {}", destination.display()))?;
    file.flush().await?;
    Ok(())
}

pub async fn run(client: &UpdClient, args: &GetArgs) -> anyhow::Result<()> {
    let fetched = match (args.width, args.height) {
        (Some(w), Some(h)) => client.fetch_resized(&args.id, w, h).await?,
        _ => client.fetch(&args.id).await?,
    };

    let (destination, explicit) = match &args.output {
        Some(path) => (path.clone(), true),
        None => (
            default_destination(fetched.original.as_deref(), &args.id),
            false,
        ),
    };

    if explicit && destination == Path::new("-") {
        std::io::stdout().write_all(&fetched.data)?;
        return Ok(());
    }

    save(&destination, &fetched.data, explicit).await?;
    eprintln!("Saved {} bytes to {}", fetched.data.len(), destination.display());
    Ok(())
}
