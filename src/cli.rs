//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use glyphpad_lib::state::Partition;

/// Glyphpad - Draw symbols on the touchpad to launch commands
#[derive(Parser, Debug)]
#[command(name = "glyphpad")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Symbol set to use (hardcoded32, hardcoded64 or user)
    #[arg(short, long, global = true)]
    pub partition: Option<Partition>,

    /// Model database path
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,
}

/// Where samples come from
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Touchpad event device (e.g. /dev/input/event5)
    #[arg(short, long)]
    pub device: Option<PathBuf>,

    /// Replay samples from a recorded journal instead of the touchpad
    #[arg(long, conflicts_with = "device")]
    pub replay: Option<PathBuf>,

    /// Seconds of stillness that end a stroke
    #[arg(long)]
    pub idle_gap: Option<f64>,

    /// End strokes as soon as the finger is lifted
    #[arg(long)]
    pub end_on_finger_lift: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recognize symbols and run their commands
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Log recognized symbols without running anything
        #[arg(long)]
        dry_run: bool,

        /// Append every interpreted stroke to this journal
        #[arg(long)]
        journal: Option<PathBuf>,
    },

    /// Teach a new symbol by drawing it repeatedly
    Train {
        /// Name of the symbol
        symbol: String,

        /// Number of strokes to collect
        #[arg(short, long)]
        size: Option<usize>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// List known symbols
    List,

    /// Delete symbols and their models
    Delete {
        /// Symbols to delete
        #[arg(required_unless_present = "all")]
        symbols: Vec<String>,

        /// Delete every symbol of the partition
        #[arg(long, conflicts_with = "symbols")]
        all: bool,
    },

    /// Include symbols in recognition again
    Activate {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Exclude symbols from recognition, keeping their models
    Deactivate {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Retrain every symbol from its stored strokes
    Relearn,

    /// Export the partition to an archive
    Export {
        /// Archive file to write
        path: PathBuf,
    },

    /// Replace the partition with the contents of an archive
    Import {
        /// Archive file to read
        path: PathBuf,
    },

    /// Record raw touchpad samples to a journal
    Record {
        /// Journal file to append to
        output: PathBuf,

        /// Touchpad event device
        #[arg(short, long)]
        device: Option<PathBuf>,
    },

    /// Show the strokes of a journal and how they classify
    Inspect {
        /// Journal file to read
        journal: PathBuf,

        /// Print the normalized points of every stroke
        #[arg(long)]
        points: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
