//! wv: weathervane CLI client
//!
//! Query a running wvd from the terminal.

use clap::{Parser, Subcommand};
use serde::Serialize;
use weathervane::client::WeatherClient;

/// Weathervane CLI client
#[derive(Parser)]
#[command(name = "wv")]
#[command(version = weathervane::PKG_VERSION)]
#[command(about = "Weathervane weather API client")]
struct Args {
    /// Server address
    #[arg(
        short,
        long,
        env = "WEATHERVANE_ADDRESS",
        default_value = "http://127.0.0.1:3000"
    )]
    address: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check service health
    Health,

    /// Current weather and forecast for a location
    Weather {
        /// Location name (e.g. "London" or "Paris, France")
        location: String,
        /// Include an AI-written description
        #[arg(long)]
        ai: bool,
    },

    /// Weather plus a rendered scene image
    Visualize {
        /// Location name
        location: String,
    },

    /// Ask a free-text weather question
    Ask {
        /// The question (e.g. "Will it rain in Lisbon?")
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let client = WeatherClient::new(&args.address)?;

    match args.command {
        Command::Health => print_json(&client.health().await?)?,
        Command::Weather { location, ai } => print_json(&client.weather(&location, ai).await?)?,
        Command::Visualize { location } => print_json(&client.visualization(&location).await?)?,
        Command::Ask { query } => print_json(&client.ask(&query.join(" ")).await?)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
