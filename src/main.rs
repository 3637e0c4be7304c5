use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    axbridge::cli::run().await
}
