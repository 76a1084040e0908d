//! inlet CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write a default config file
//! - `chat`    — Run one streamed exchange (or a background task)
//! - `search`  — Search the web and print scraped results
//! - `fetch`   — Fetch and normalize a single page

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "inlet",
    about = "inlet — streaming chat relay with web search and document context",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Send a message through the relay
    Chat {
        /// The message to send
        message: String,

        /// Caller identity (an email address)
        #[arg(short, long, env = "INLET_USER")]
        user: String,

        /// Run as a background task (non-streamed, errors swallowed)
        #[arg(short, long)]
        task: Option<String>,

        /// Search the web first and inject the results as context
        #[arg(short, long)]
        search: bool,
    },

    /// Search the web and print the scraped results
    Search {
        /// The search query
        query: String,
    },

    /// Fetch a single page and print its normalized text
    Fetch {
        /// The page URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat {
            message,
            user,
            task,
            search,
        } => commands::chat::run(message, user, task, search).await?,
        Commands::Search { query } => commands::search::run(query).await?,
        Commands::Fetch { url } => commands::fetch::run(url).await?,
    }

    Ok(())
}
