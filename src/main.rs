use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    voxcast::app::run_listen_command().await?;
    Ok(())
}
