use clap::Parser;
use rookvault_core::ServiceConfig;

/// Transfer Service for backing up cluster images to cold storage.
#[derive(Parser, Debug)]
#[command(name = "rookvault-api", version)]
struct Args {
    /// Port to listen on (overrides SERVER_PORT)
    #[arg(long)]
    listen_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    let mut config = ServiceConfig::from_env()?;
    if let Some(port) = args.listen_port {
        config.server_port = port;
    }

    let (_state, router) = rookvault_api::setup::initialize_app(config.clone()).await?;

    rookvault_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
