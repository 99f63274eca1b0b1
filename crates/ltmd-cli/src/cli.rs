use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LTMD CLI - Coarse eigenbasis construction from block Hessians for long-timestep molecular dynamics.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the coarse eigenvectors of a block Hessian problem file.
    Diagonalize(DiagonalizeArgs),
}

/// Arguments for the `diagonalize` subcommand.
#[derive(Args, Debug)]
pub struct DiagonalizeArgs {
    // --- Core Arguments ---
    /// Path to the problem file in TOML format (atoms, blocks, couplings).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the eigenvector output, written as "row col value" triples.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to the diagonalization configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Truncation Overrides ---
    /// Override the block eigenvalue threshold from the config file.
    #[arg(short = 't', long, value_name = "FLOAT")]
    pub threshold: Option<f64>,

    /// Keep a fixed number of modes per block on average instead of truncating by threshold.
    #[arg(long, value_name = "INT")]
    pub columns: Option<usize>,

    /// Override the inter-block coupling cutoff distance.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    // --- Mode Overrides ---
    /// Substitute geometric rigid-body and hinge modes into each block basis.
    #[arg(long)]
    pub geometric: bool,

    /// Record eigensolver failures and continue instead of aborting.
    #[arg(long)]
    pub best_effort: bool,

    /// Write every diagnostic artifact (eigM, eigRed, blockH) into this directory.
    #[arg(long, value_name = "PATH")]
    pub diagnostics_dir: Option<PathBuf>,
}
