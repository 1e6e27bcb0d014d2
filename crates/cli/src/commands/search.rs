use clap::Args;
use upd_client::UpdClient;

use super::availability;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Tags to look for; files carrying any of them match.
    #[arg(long, value_delimiter = ',', required = true)]
    pub tags: Vec<String>,
}

pub async fn run(client: &UpdClient, args: &SearchArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let results = client.search_tags(&args.tags).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => {
            println!("{} result(s)", results.len());
            for entry in &results {
                println!("--");
                println!("Original: {}", entry.original);
                println!("URL: {}", client.file_url(&entry.filename));
                println!(
                    "Delete URL: {}",
                    client.delete_url(&entry.filename, &entry.delete_key)
                );
                println!("Tags: {}", entry.tags.join(", "));
                println!("{}", availability(entry.expiration_time));
            }
        }
    }
    Ok(())
}
