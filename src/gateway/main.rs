use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use keyhole::config::Settings;
use keyhole::front_door::router;
use keyhole::logging::setup_logging;
use keyhole::service::client::RpcClient;

/// HTTP front door: `GET /search?key=<int>` forwarded to the lookup backend.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, env = "KEYHOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `front_door.listen`
    #[arg(long)]
    listen: Option<String>,

    /// Overrides `front_door.backend`
    #[arg(long)]
    backend: Option<String>,

    /// Debug level, repeat for more (-d, -dd, -ddd)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        settings.front_door.listen = listen;
    }
    if let Some(backend) = cli.backend {
        settings.front_door.backend = backend;
    }
    let front_door = &settings.front_door;
    let address = front_door.listen_addr()?;

    // one client for the whole process; the channel reconnects as needed
    let client = RpcClient::connect_lazy(
        &front_door.backend,
        front_door.rpc_timeout(),
        front_door.retries,
    )?;

    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(%address, backend = %front_door.backend, "front door listening");
    axum::serve(listener, router(Arc::new(client))).await?;

    Ok(())
}
