//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Sleep diary converter.
///
/// Detects the format of diary exports and converts between them through the
/// Standard format.
#[derive(Debug, Parser)]
#[command(name = "sdc", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the registered formats.
    Formats,

    /// Print the format that recognises a file.
    Detect {
        /// The diary file.
        file: PathBuf,
    },

    /// Convert a diary into another format.
    Convert {
        /// The diary file.
        file: PathBuf,

        /// Target format name (defaults to the configured format).
        #[arg(long)]
        to: Option<String>,

        /// How to print the result.
        #[arg(long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Merge several diaries into the format of the first.
    Merge {
        /// The diary files. Later files are merged into the first.
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        /// How to print the result.
        #[arg(long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Convert many files in parallel, writing one JSON file per input.
    Batch {
        /// The diary files.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target format name.
        #[arg(long)]
        to: String,

        /// Directory for the converted files (defaults to each input's directory).
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

/// Output encodings for a converted diary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `{"file_format", "contents"}` envelope.
    #[default]
    Json,
    /// `sleep-diary=` URL.
    Url,
    /// One CSV block per sheet, for formats with a spreadsheet form.
    Csv,
}
