use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Document-grounded case checks.
#[derive(Parser, Debug)]
#[command(name = "casecheck", version, about)]
pub struct Cli {
    /// Runtime configuration file (YAML)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a PDF or TXT document into chunks
    Chunk {
        /// Process description (.pdf or .txt)
        file: PathBuf,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value_t = ChunkFormat::Json)]
        format: ChunkFormat,
    },

    /// Retrieve the chunks most relevant to a query
    Search {
        /// Process description (.pdf or .txt)
        file: PathBuf,

        /// Free-text query
        #[arg(long, short = 'q')]
        query: String,

        /// Number of evidence items; defaults to the configured value
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Run a full case check
    Check {
        /// Process description (.pdf or .txt)
        file: PathBuf,

        /// Case inputs as a JSON file
        #[arg(long, short = 'i')]
        inputs: PathBuf,

        /// Replay a recorded collaborator response instead of calling the provider
        #[arg(long)]
        response: Option<PathBuf>,

        /// Also write the result JSON to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Normalize a raw decision payload from a file or stdin
    Normalize {
        /// Raw payload; reads stdin when omitted
        file: Option<PathBuf>,

        /// Include how the payload was repaired
        #[arg(long)]
        report: bool,
    },
}

/// How `chunk` prints its chunks.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkFormat {
    /// One JSON object per line
    Json,

    /// Aligned columns with a text preview
    Table,
}
