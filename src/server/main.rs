use std::path::PathBuf;

use clap::Parser;
use keyhole::btree::BTree;
use keyhole::config::Settings;
use keyhole::logging::setup_logging;
use keyhole::service::IndexServer;

/// gRPC backend answering key-existence lookups from an in-memory B-tree.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, env = "KEYHOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `server.listen`
    #[arg(long)]
    listen: Option<String>,

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
        settings.server.listen = listen;
    }
    let address = settings.server.listen_addr()?;

    let server = IndexServer::new(BTree::with_degree(settings.server.degree)?);

    // the gate stays shut until the seed keys are in
    let seeder = server.clone();
    let server_settings = settings.server.clone();
    tokio::task::spawn_blocking(move || {
        let mut keys: Vec<String> = server_settings
            .seed_keys
            .iter()
            .map(|k| k.to_string())
            .collect();
        match server_settings.seed_lines() {
            Ok(lines) => keys.extend(lines),
            Err(e) => tracing::error!(error = %e, "skipping seed file"),
        }
        if let Err(status) = seeder.seed(keys) {
            tracing::error!(%status, "seeding failed");
        }
    });

    tracing::info!(%address, degree = settings.server.degree, "lookup server listening");
    server.into_router()?.serve(address).await?;

    Ok(())
}
