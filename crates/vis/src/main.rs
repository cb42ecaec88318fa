//! vis - vertical-interval analysis of musical pieces
//!
//! Subcommands:
//! - `vis modes <kind>` - Display modes and enabled fields for an object kind
//! - `vis parts <piece>` - List the parts of a piece
//! - `vis combos <piece>` - List every part pair
//! - `vis run <piece> ...` - Run one experiment
//! - `vis config` - Print the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vis_analysis::{DisplayMode, ObjectKind, PartCombination, Repeats, SortKey, SortOrder};
use visconf::VisConfig;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "vis")]
#[command(about = "Count notes, intervals, n-grams, and chords in musical pieces")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./vis.toml (`~/` and `$VAR` are expanded)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which display modes and fields an object kind supports
    Modes {
        /// note, interval, interval_ngram, or chord
        kind: ObjectKind,
    },

    /// List the parts of a piece
    Parts {
        /// Piece JSON file
        piece: PathBuf,

        /// Metadata corrections (JSON with `title` and `part_names`)
        #[arg(long)]
        corrections: Option<PathBuf>,
    },

    /// List every pair of parts, upper voice first
    Combos {
        /// Piece JSON file
        piece: PathBuf,
    },

    /// Run one experiment and print its result
    Run {
        /// Piece JSON file
        piece: PathBuf,

        /// Object kind: note, interval, interval_ngram, or chord
        #[arg(short, long)]
        kind: ObjectKind,

        /// Display mode: list or score (default: first available)
        #[arg(short, long)]
        mode: Option<DisplayMode>,

        /// Part indices, top-down (e.g. "0,1")
        #[arg(short, long)]
        parts: PartCombination,

        /// Offset interval in quarter lengths
        #[arg(short, long)]
        offset: Option<f64>,

        /// Repeated verticals: keep or collapse
        #[arg(long)]
        repeats: Option<Repeats>,

        /// N-gram length
        #[arg(short, long)]
        n: Option<usize>,

        /// Number of n-grams in a summary score
        #[arg(long)]
        top_k: Option<usize>,

        /// Drop labels heard fewer times than this (list mode)
        #[arg(long)]
        threshold: Option<usize>,

        /// Order of a list: frequency or label
        #[arg(long)]
        sort: Option<SortKey>,

        /// Direction of a list: descending or ascending
        #[arg(long)]
        sort_order: Option<SortOrder>,

        /// Reduce compound intervals to within an octave
        #[arg(long)]
        simple: bool,

        /// Omit interval quality (3 instead of m3)
        #[arg(long)]
        no_quality: bool,

        /// Direction signs: always, descending, or never
        #[arg(long)]
        direction: Option<String>,

        /// Interleave lowest-voice motion in n-gram labels
        #[arg(long)]
        horizontal: bool,

        /// Metadata corrections (JSON with `title` and `part_names`)
        #[arg(long)]
        corrections: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration and where it came from
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = VisConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.log_level)
                .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string())),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Modes { kind } => {
            print!("{}", commands::modes(kind));
        }
        Commands::Parts { piece, corrections } => {
            let piece = commands::load_piece(&piece, corrections.as_deref())?;
            print!("{}", commands::parts(&piece));
        }
        Commands::Combos { piece } => {
            let piece = commands::load_piece(&piece, None)?;
            print!("{}", commands::combos(&piece));
        }
        Commands::Run {
            piece,
            kind,
            mode,
            parts,
            offset,
            repeats,
            n,
            top_k,
            threshold,
            sort,
            sort_order,
            simple,
            no_quality,
            direction,
            horizontal,
            corrections,
            json,
        } => {
            let args = commands::RunArgs {
                kind,
                mode,
                parts,
                offset,
                n,
                top_k,
                threshold,
                sort,
                sort_order,
                repeats,
                simple,
                no_quality,
                direction,
                horizontal,
            };
            let piece = commands::load_piece(&piece, corrections.as_deref())?;
            let report = commands::run(piece, &args, &config).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", output::render(&report));
            }
        }
        Commands::Config => {
            print!("{}", commands::show_config(&config, &sources));
        }
    }

    Ok(())
}
