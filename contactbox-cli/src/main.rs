//! contactbox CLI - contact form backend
//!
//! - `serve`: run the HTTP API
//! - `schema`: print the table definition
//! - `check-config`: validate database settings from the environment

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "contactbox",
    author,
    version,
    about = "Contact form backend with a self-healing Postgres connection"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Print the users table definition
    Schema,
    /// Validate database settings from the environment
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be set
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await?,
        Commands::Schema => commands::run_schema(),
        Commands::CheckConfig => commands::run_check_config()?,
    }

    Ok(())
}
