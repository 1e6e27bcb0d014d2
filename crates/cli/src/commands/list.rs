use upd_client::UpdClient;

use crate::OutputFormat;

pub async fn run(client: &UpdClient, format: &OutputFormat) -> anyhow::Result<()> {
    let entries = client.list().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No files.");
            }
            for entry in &entries {
                println!(
                    "{created} | {url} | {original}",
                    created = entry.creation_time.format("%Y-%m-%d %H:%M:%S"),
                    url = client.file_url(&entry.name),
                    original = entry.original,
                );
                println!("  delete: {}", client.delete_url(&entry.name, &entry.delete_key));
            }
        }
    }
    Ok(())
}
