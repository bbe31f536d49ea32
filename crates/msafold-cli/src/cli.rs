use clap::{Args, Parser, Subcommand, ValueEnum};
use msafold::engine::config::AlignmentStrategy;
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
    about = "msafold - Build a multiple sequence alignment for a protein query and fold it with an external structure predictor.",
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
    /// Run the full pipeline: database preparation, homology search, alignment and structure prediction.
    Run(RunArgs),
    /// Check that an alignment file is usable as predictor input.
    CheckAln(CheckAlnArgs),
    /// Print the match-state residues of the first record of a FASTA or A3M file.
    FirstSeq(FirstSeqArgs),
    /// Check a structural constraint file against the residue range of a query.
    CheckConstraints(CheckConstraintsArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    // --- Inputs ---
    #[command(flatten)]
    pub query: QuerySource,

    /// Sequence database: a FASTA file (optionally gzipped) for the direct strategy,
    /// or an HH-suite database prefix for fragment insertion.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub database: PathBuf,

    /// Directory holding every intermediate artifact and the tool logs.
    #[arg(short, long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Directory the predictor writes its structures to. Defaults to `<work-dir>/predictions`.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Pipeline Overrides ---
    /// How the alignment is built.
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub strategy: Option<StrategyArg>,

    /// Number of homologs aligned with the query, the query itself not included.
    #[arg(short = 'k', long, value_name = "INT")]
    pub top_hits: Option<usize>,

    /// Threads handed to the pairwise search tool.
    #[arg(long, value_name = "INT")]
    pub search_threads: Option<usize>,

    // --- Prediction Overrides ---
    /// Worker processes used by the structure predictor.
    #[arg(long, value_name = "INT")]
    pub workers: Option<usize>,

    /// Number of structures the predictor generates.
    #[arg(long, value_name = "INT")]
    pub n_structures: Option<usize>,

    /// Number of folding iterations per structure.
    #[arg(long, value_name = "INT")]
    pub n_iterations: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S prediction.workers=8
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Exactly one source for the query sequence.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct QuerySource {
    /// File holding the query, as FASTA or as a bare residue string.
    #[arg(short = 'i', long = "query", value_name = "PATH")]
    pub query_file: Option<PathBuf>,

    /// The query residues given inline.
    #[arg(long = "sequence", value_name = "TEXT")]
    pub sequence: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    /// Extract the top hits from the database and align them from scratch.
    Direct,
    /// Add profile-search hits as fragments to the query without changing its length.
    FragmentInsertion,
}

impl From<StrategyArg> for AlignmentStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Direct => AlignmentStrategy::Direct,
            StrategyArg::FragmentInsertion => AlignmentStrategy::FragmentInsertion,
        }
    }
}

/// Arguments for the `check-aln` subcommand.
#[derive(Args, Debug)]
pub struct CheckAlnArgs {
    /// Alignment in the plain one-row-per-line format or as FASTA.
    #[arg(required = true, value_name = "PATH")]
    pub path: PathBuf,
}

/// Arguments for the `first-seq` subcommand.
#[derive(Args, Debug)]
pub struct FirstSeqArgs {
    /// FASTA or A3M file.
    #[arg(required = true, value_name = "PATH")]
    pub path: PathBuf,

    /// Write the residues to a file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `check-constraints` subcommand.
#[derive(Args, Debug)]
pub struct CheckConstraintsArgs {
    /// Constraint file with `AtomPair`, `Angle` and `Dihedral` lines.
    #[arg(required = true, value_name = "CST")]
    pub constraints: PathBuf,

    /// FASTA file of the query the constraints were generated for.
    #[arg(long, required = true, value_name = "FASTA")]
    pub query: PathBuf,
}
