pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "expedientes")]
#[command(about = "Expedientes CLI - schema bootstrap and remote listing for the Expedientes API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create tables and indexes in the configured database")]
    Migrate(commands::migrate::MigrateArgs),

    #[command(about = "List records from a running server with filters and pagination")]
    Find(commands::find::FindArgs),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
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
        Commands::Migrate(args) => commands::migrate::handle(args, output_format).await,
        Commands::Find(args) => commands::find::handle(args, output_format).await,
    }
}
