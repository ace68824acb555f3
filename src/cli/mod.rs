pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront CLI - seeding, tokens and health checks for the storefront API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the super admin account and the default category tree")]
    Seed(commands::seed::SeedArgs),

    #[command(about = "Mint a JWT for local testing")]
    Token(commands::token::TokenArgs),

    #[command(about = "Check connectivity to the configured document store")]
    Check,

    #[command(about = "Check a running server through its /health endpoint")]
    Ping(commands::ping::PingArgs),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Seed(args) => commands::seed::handle(args, output_format).await,
        Commands::Token(args) => commands::token::handle(args, output_format).await,
        Commands::Check => commands::check::handle(output_format).await,
        Commands::Ping(args) => commands::ping::handle(args, output_format).await,
    }
}
