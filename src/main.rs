//! # Casebook CLI (`cbk`)
//!
//! The `cbk` binary drives both halves of the system: the offline
//! ingestion pipeline and the online answering pipeline.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cbk ingest` | Rebuild the vector index from the corpus directory |
//! | `cbk ask "<question>"` | Answer one question and exit |
//! | `cbk chat` | Interactive question loop |
//! | `cbk serve` | Start the HTTP server (`POST /ask`) |
//!
//! All commands accept `--config` pointing at a TOML configuration file;
//! see `config/casebook.example.toml`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use casebook::{chat, config, ingest, server, service::QueryService};

/// Casebook — grounded Q&A over a fixed corpus of investigation manuals.
#[derive(Parser)]
#[command(
    name = "cbk",
    about = "Casebook — grounded Q&A over a fixed corpus of investigation manuals",
    version,
    long_about = "Casebook ingests a directory of procedural manuals into a vector index \
    and answers questions strictly from that corpus, citing source and page for every \
    claim and refusing when the manuals do not cover the question."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/casebook.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the vector index from the corpus directory.
    ///
    /// Deletes any existing index, then loads, chunks, and embeds every
    /// document before writing the new index. Aborts without building if
    /// the corpus is empty or any stage fails.
    Ingest,

    /// Answer a single question and print the result.
    Ask {
        /// The question to answer.
        query: String,
    },

    /// Interactive question loop. Type 'exit' to quit.
    Chat,

    /// Start the HTTP server exposing POST /ask.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest => {
            ingest::run_ingest(&cfg).await?;
        }
        Commands::Ask { query } => {
            let service = QueryService::open(&cfg).await?;
            let answer = service.answer(&query).await?;
            println!("{}", answer);
        }
        Commands::Chat => {
            chat::run_chat(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
