use bobple::client::cli_client::{run, Cli};
use bobple::utils::logger;
use bobple::ClientConfig;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env();
    logger::init(&config.log_level);
    let cli = Cli::parse();
    run(cli, config).await
}
