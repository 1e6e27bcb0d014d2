use upd_client::UpdClient;

use crate::OutputFormat;

pub async fn run(client: &UpdClient, format: &OutputFormat) -> anyhow::Result<()> {
    let status = client.auth_check().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => {
            if status.is_ok() {
                println!("Secret key accepted.");
            } else {
                println!("Secret key rejected.");
            }
        }
    }
    if !status.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}
