use upd_client::UpdClient;

pub async fn run(client: &UpdClient) -> anyhow::Result<()> {
    match client.health().await {
        Ok(true) => {
            println!("upd server is healthy.");
            Ok(())
        }
        Ok(false) => {
            eprintln!("upd server returned unhealthy status.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to reach server: {e}");
            std::process::exit(1);
        }
    }
}
