use std::path::PathBuf;

use clap::{Parser, Subcommand};
use keyhole::config::Settings;
use keyhole::front_door::SearchReply;
use keyhole::logging::setup_logging;
use keyhole::service::client::RpcClient;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Looks keys up through the HTTP front door, or inserts them over RPC.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Front door base URL
    #[arg(long, env = "KEYHOLE_URL", default_value = "http://localhost:8000")]
    url: String,

    /// Settings file (TOML), used for the backend address on `insert`
    #[arg(short, long, env = "KEYHOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Debug level, repeat for more (-d, -dd, -ddd)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up a single key
    Search { key: i64 },
    /// Prompt for keys until `exit`
    Interactive,
    /// Insert keys directly into the backend
    Insert {
        #[arg(required = true)]
        keys: Vec<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    match cli.command {
        Command::Search { key } => search_for_key(&http, &cli.url, key).await,
        Command::Interactive => interactive(&http, &cli.url).await?,
        Command::Insert { keys } => {
            let settings = Settings::load(cli.config.as_deref())?;
            let front_door = &settings.front_door;
            let client = RpcClient::connect_lazy(
                &front_door.backend,
                front_door.rpc_timeout(),
                front_door.retries,
            )?;
            for key in keys {
                let size = client.insert(key).await?;
                println!("Inserted {key}; index now holds {size} key(s).");
            }
        }
    }

    Ok(())
}

async fn interactive(http: &reqwest::Client, url: &str) -> std::io::Result<()> {
    println!("Client to search for a key in the server's B-Tree.");
    println!("Type 'exit' to quit.");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"\nEnter a number to search for: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") {
            break;
        }

        match input.parse::<i64>() {
            Ok(key) => search_for_key(http, url, key).await,
            Err(_) => println!("Invalid input. Please enter an integer."),
        }
    }
    Ok(())
}

async fn search_for_key(http: &reqwest::Client, url: &str, key: i64) {
    let search_url = format!("{}/search?key={}", url.trim_end_matches('/'), key);
    println!("Sending request to: {search_url}");

    let response = match http.get(&search_url).send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            println!("\nError: The request timed out.");
            println!("The server might be busy or the backend data service is down.");
            return;
        }
        Err(e) if e.is_connect() => {
            println!("\nError: Could not connect to the application server.");
            println!("Please make sure the front door is running.");
            return;
        }
        Err(e) => {
            println!("\nAn unexpected error occurred: {e}");
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        println!("\nError: Received status code {}", status.as_u16());
        let body = response.text().await.unwrap_or_default();
        println!("Response from server: {body}");
        return;
    }

    match response.json::<SearchReply>().await {
        Ok(reply) => {
            println!("\n--- Server Response ---");
            if reply.found {
                println!("SUCCESS: Key '{}' was found.", reply.key_searched);
            } else {
                println!("FAILURE: Key '{}' was NOT found.", reply.key_searched);
            }
            if let Some(error) = reply.error {
                println!("Server error message: {error}");
            }
            println!("-----------------------");
        }
        Err(e) => println!("\nAn unexpected error occurred: {e}"),
    }
}
