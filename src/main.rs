mod cli;
mod config;
mod support_client;

use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::cli::chat::ChatContext;
use crate::config::Config;
use crate::support_client::SupportClient;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Send a single message, print the reply and exit
    #[arg(short, long)]
    input: Option<String>,

    /// Base URL of the chat backend (overrides SUPPORT_CHAT_BASE_URL)
    #[arg(short, long)]
    base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        /// Send a single message, print the reply and exit
        #[arg(short, long)]
        input: Option<String>,

        /// Base URL of the chat backend (overrides SUPPORT_CHAT_BASE_URL)
        #[arg(short, long)]
        base_url: Option<String>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let (input, base_url, verbose) = match cli.command {
        Some(Commands::Chat { input, base_url, verbose }) => (input, base_url, verbose),
        None => (cli.input, cli.base_url, cli.verbose),
    };

    let log_level = if verbose { Level::DEBUG } else { Level::WARN };

    // Logs go to stderr so they stay out of the transcript.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::resolve(base_url.as_deref())?;
    let client = SupportClient::new(config.chat_endpoint()?);
    info!("Using chat backend at {}", client.endpoint());

    let interactive = input.is_none();
    let mut chat_context = ChatContext::new(
        Box::new(io::stdout()),
        input,
        interactive,
        Box::new(client),
    );
    chat_context.run().await
}
