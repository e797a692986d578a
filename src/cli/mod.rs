//! CLI module for Sikt.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Sikt - Video Knowledge Base and RAG
///
/// Turns decoded videos into a queryable knowledge base with grounded,
/// citation-bearing answers. The name "Sikt" comes from the Norwegian word
/// for "sight."
#[derive(Parser, Debug)]
#[command(name = "sikt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a decoded-media manifest and index the video
    Ingest {
        /// Path to the media manifest JSON file
        manifest: String,

        /// Ask a question immediately after ingestion completes
        #[arg(short, long)]
        question: Option<String>,
    },

    /// Ask a question about an ingested video
    Ask {
        /// The question to ask
        question: String,

        /// Job ID of the ingested video
        #[arg(short, long)]
        job: String,
    },

    /// List ingested videos
    Jobs,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}
