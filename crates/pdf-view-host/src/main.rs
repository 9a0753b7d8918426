mod document;
mod logger;
mod responder;
mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_view_sync::{LogNotifier, ViewerConfig};
use std::path::PathBuf;
use std::sync::Arc;

use crate::document::LopdfLoader;
use crate::logger::CliLogger;

#[derive(Parser)]
#[command(name = "pdfv", about = "PDF viewer sync host", version)]
struct Cli {
    /// Viewer config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the descriptor the host would send for a PDF
    Describe {
        /// Input PDF file
        file: PathBuf,
    },

    /// Run a scripted session against the built-in host
    Replay {
        /// Script file, one JSON step per line
        script: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logger = CliLogger::new(500, cli.verbose);
    logger.init().context("Failed to install logger")?;

    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path)
            .await
            .with_context(|| format!("Cannot load config {}", path.display()))?,
        None => ViewerConfig::default(),
    };

    match cli.command {
        Commands::Describe { file } => {
            let descriptor = document::describe(&file).await?;
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }

        Commands::Replay { script } => {
            let summary = script::run(
                &script,
                config,
                Arc::new(LopdfLoader),
                Arc::new(LogNotifier),
                std::io::stdout().lock(),
            )
            .await?;

            eprintln!(
                "Replayed {} steps ({} skipped), {} UI messages, {} warnings",
                summary.steps,
                summary.skipped,
                summary.ui_messages,
                logger.warning_count()
            );
            if let Some(error) = &summary.state.error {
                eprintln!("Viewer ended with error: {}", error);
            }
        }
    }

    Ok(())
}
