//! `hdbg` — operator tool for HDBG chunk files
//!
//! Runs the diagnostic (best-effort) decoder over a chunk captured on disk,
//! typically one the ingestion archive stored after strict decoding rejected
//! it, and prints whatever could be recovered.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hdbg_core::{inspect_chunk, ChunkInspection, FileTable, MessageDictionary};

// ----------------------------------------------------------------------------
// Command Line
// ----------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "hdbg", about = "Inspect HDBG diagnostic-log chunks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Best-effort decode of a chunk file, printing everything recoverable
    Inspect {
        /// Path to the chunk file
        file: PathBuf,
        /// Print the inspection as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

// ----------------------------------------------------------------------------
// Entry Point
// ----------------------------------------------------------------------------

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Inspect { file, json } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read chunk file {}", file.display()))?;

            let inspection = inspect_chunk(
                &bytes,
                &MessageDictionary::builtin(),
                &FileTable::builtin(),
            );

            if json {
                print_json(&inspection)?;
            } else {
                print_text(&inspection);
            }

            // Non-zero exit when the chunk carries a fatal condition, so the
            // tool is usable from scripts triaging an archive directory.
            Ok(if inspection.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

// ----------------------------------------------------------------------------
// Output
// ----------------------------------------------------------------------------

fn print_text(inspection: &ChunkInspection) {
    match &inspection.header {
        Some(header) => {
            println!(
                "chunk: format {}.{}, date {}, dictionary {}.{}, device {}, id {}",
                header.version_major,
                header.version_minor,
                header.date,
                header.dictionary_revision.0,
                header.dictionary_revision.1,
                header.device_id.as_deref().unwrap_or("-"),
                header
                    .chunk_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_owned()),
            );
        }
        None => println!("chunk: header unreadable"),
    }

    for record in &inspection.records {
        println!("{} {} {}", record.timestamp, record.level, record.text);
    }

    println!("records recovered: {}", inspection.records.len());
    if let Some(error) = &inspection.error {
        println!("fatal condition: {error}");
    }
}

fn print_json(inspection: &ChunkInspection) -> anyhow::Result<()> {
    let value = serde_json::json!({
        "header": inspection.header,
        "records": inspection.records,
        "error": inspection.error,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
