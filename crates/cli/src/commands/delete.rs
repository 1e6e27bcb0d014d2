use clap::Args;
use upd_client::UpdClient;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// File identifier.
    pub id: String,
    /// Delete key returned by the upload.
    pub key: String,
}

pub async fn run(client: &UpdClient, args: &DeleteArgs) -> anyhow::Result<()> {
    client.delete(&args.id, &args.key).await?;
    println!("File deleted.");
    Ok(())
}
