use electronbond_http::{ElectronBondClient, HttpMethods};
use futures::TryStreamExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut client = ElectronBondClient::from_env()?;

    if client.config().username.is_some() {
        client.authorize().await?;
    } else if client.config().oauth_client_id.is_some() {
        client.authorize_oauth().await?;
    }

    let status = client.get("/status/").send().await?.status();
    println!("status endpoint answered {status}");

    let transfers: Vec<serde_json::Value> = client
        .get_paged("/transfers/")
        .param("process_status", 20)
        .into_stream()
        .try_collect()
        .await?;

    for transfer in &transfers {
        println!("{}", transfer["identifier"]);
    }

    Ok(())
}
