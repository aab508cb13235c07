pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "trainer-admin-api")]
#[command(about = "Trainer admin API server and payload tooling")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Print a fresh 64-hex-character envelope key")]
    Keygen,

    #[command(about = "Seal a JSON object with the configured envelope key")]
    Seal {
        #[arg(value_name = "JSON", help = "JSON object to seal")]
        payload: String,
    },

    #[command(about = "Open an {iv, data, mac} envelope with the configured envelope key")]
    Open {
        #[arg(help = "Envelope JSON")]
        envelope: String,
    },

    #[command(about = "Send a request to a running server, sealing the body and opening the reply")]
    Request {
        #[command(flatten)]
        args: commands::request::RequestArgs,
    },
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

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::handle().await,
        Commands::Keygen => commands::envelope::keygen(output_format),
        Commands::Seal { payload } => commands::envelope::seal(&payload, output_format),
        Commands::Open { envelope } => commands::envelope::open(&envelope, output_format),
        Commands::Request { args } => commands::request::handle(args, output_format).await,
    }
}
