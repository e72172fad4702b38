// SPDX-License-Identifier: MIT OR Apache-2.0
//! `flowgraph` - run, inspect and generate graph documents
//!
//! Loads documents with the built-in node library, so only graphs built
//! from the `math`, `logic` and `text` containers and the stock instance
//! and handler types can be resolved.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use flowgraph_core::DocumentFormat;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "flowgraph", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate a document and print the outputs of its result nodes
    Run {
        /// Document to evaluate
        path: PathBuf,
        /// Print the outputs as a JSON object
        #[arg(long)]
        json: bool,
    },
    /// List the nodes and links of a document
    Inspect {
        /// Document to list
        path: PathBuf,
    },
    /// Write a small sample graph
    Demo {
        /// Destination file
        path: PathBuf,
        /// Encoding, chosen by extension when omitted
        #[arg(long, value_enum)]
        format: Option<Format>,
        /// Write without indentation
        #[arg(long)]
        compact: bool,
    },
    /// Re-encode a document, choosing both formats by extension
    Convert {
        /// Source document
        input: PathBuf,
        /// Destination document
        output: PathBuf,
        /// Write without indentation
        #[arg(long)]
        compact: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Ron,
}

impl From<Format> for DocumentFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => DocumentFormat::Json,
            Format::Ron => DocumentFormat::Ron,
        }
    }
}

fn main() {
    // RUST_LOG wins over the default directive
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("flowgraph_core=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run { path, json } => commands::run(&path, json),
        Command::Inspect { path } => commands::inspect(&path),
        Command::Demo {
            path,
            format,
            compact,
        } => commands::demo(&path, format.map(Into::into), !compact),
        Command::Convert {
            input,
            output,
            compact,
        } => commands::convert(&input, &output, !compact),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
