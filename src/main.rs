//! # InstaMon CLI (`instamon`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `instamon serve` | Start the web form server |
//! | `instamon parse <file>` | Parse a paste file and print the records |
//! | `instamon push <file>` | Parse a paste file and append it to the sheet |
//!
//! ## Examples
//!
//! ```bash
//! # Start the server
//! instamon serve --config ./config/instamon.toml
//!
//! # Check what a clipboard dump would produce
//! pbpaste | instamon parse -
//!
//! # Append a saved batch without the browser
//! instamon push batch.csv --config ./config/instamon.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use instamon::{config, ingest, logging, push, server};

/// InstaMon: paste bookmarklet output, get clean spreadsheet rows.
#[derive(Parser)]
#[command(
    name = "instamon",
    about = "InstaMon: paste bookmarklet output, get clean spreadsheet rows",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/instamon.toml`. Not needed for `parse`.
    #[arg(long, global = true, default_value = "./config/instamon.toml")]
    config: PathBuf,

    /// Debug-level logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Parse a paste file and print accepted records and counts.
    ///
    /// Every link is treated as new. Nothing is sent anywhere.
    Parse {
        /// Input file, or `-` for stdin.
        input: PathBuf,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Parse a paste file and append the accepted rows to the sheet.
    Push {
        /// Input file, or `-` for stdin.
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Commands that don't require config
    if let Commands::Parse { input, json } = &cli.command {
        return ingest::run_parse(input, *json);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Push { input } => {
            push::run_push(&cfg, &input).await?;
        }
        Commands::Parse { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
