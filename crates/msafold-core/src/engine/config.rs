use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_TOP_HITS: usize = 10;
pub const DEFAULT_SEARCH_THREADS: usize = 2;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_N_STRUCTURES: usize = 5;
pub const DEFAULT_N_ITERATIONS: usize = 3;

/// Fixed search thresholds handed to the external search tools.
pub mod search {
    pub const BLASTP_EVALUE: &str = "1e-5";
    pub const BLASTP_OUTFMT: &str = "5";
    pub const HHBLITS_ITERATIONS: &str = "3";
    pub const HHBLITS_EVALUE: &str = "0.001";
    pub const HHBLITS_MAX_SEQUENCES: &str = "500";
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Parameter '{0}' must be at least 1")]
    NonPositive(&'static str),
    #[error("Tool command for '{0}' is empty")]
    EmptyToolCommand(&'static str),
    #[error("Unknown alignment strategy '{0}' (expected 'direct' or 'fragment-insertion')")]
    UnknownStrategy(String),
}

/// How the alignment fed to the predictor is produced. Chosen once per run; it also
/// decides which search tool runs and what kind of database is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlignmentStrategy {
    /// Pairwise search against a BLAST database, then a from-scratch alignment of the
    /// query and the extracted hits.
    Direct,
    /// Profile search against an HH-suite database, then insertion of the homolog
    /// fragments into the query's fixed columns.
    #[default]
    FragmentInsertion,
}

impl AlignmentStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::FragmentInsertion => "fragment-insertion",
        }
    }
}

impl fmt::Display for AlignmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlignmentStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "fragment-insertion" | "fragment_insertion" | "fragments" => {
                Ok(Self::FragmentInsertion)
            }
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

/// An external program plus any leading arguments that precede the stage's own
/// arguments, e.g. `sh ./run_ProFOLD.sh` or `conda run -n fold mafft`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Splits a whitespace-separated command line. Returns `None` for a blank string.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts))
    }

    /// The short name used for log files and progress events.
    pub fn name(&self) -> &str {
        let candidate = self
            .args
            .iter()
            .rev()
            .find(|arg| !arg.starts_with('-'))
            .filter(|_| matches!(self.program.as_str(), "sh" | "bash" | "env"))
            .unwrap_or(&self.program);
        std::path::Path::new(candidate)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(candidate.as_str())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub indexer: ToolCommand,
    pub pairwise_search: ToolCommand,
    pub profile_search: ToolCommand,
    pub aligner: ToolCommand,
    pub predictor: ToolCommand,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            indexer: ToolCommand::new("makeblastdb"),
            pairwise_search: ToolCommand::new("blastp"),
            profile_search: ToolCommand::new("hhblits"),
            aligner: ToolCommand::new("mafft"),
            predictor: ToolCommand::new("./run_ProFOLD.sh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub top_hits: usize,
    pub threads: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionConfig {
    pub workers: usize,
    pub n_structures: usize,
    pub n_iterations: usize,
}

/// The immutable configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub strategy: AlignmentStrategy,
    pub search: SearchConfig,
    pub prediction: PredictionConfig,
    pub tools: ToolPaths,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: AlignmentStrategy::default(),
            search: SearchConfig {
                top_hits: DEFAULT_TOP_HITS,
                threads: DEFAULT_SEARCH_THREADS,
            },
            prediction: PredictionConfig {
                workers: DEFAULT_WORKERS,
                n_structures: DEFAULT_N_STRUCTURES,
                n_iterations: DEFAULT_N_ITERATIONS,
            },
            tools: ToolPaths::default(),
        }
    }
}

impl PipelineConfig {
    /// Re-checks the numeric bounds. Configurations are built through the builder, but
    /// the fields are public and the orchestrator validates again at its boundary.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("top_hits", self.search.top_hits),
            ("search_threads", self.search.threads),
            ("workers", self.prediction.workers),
            ("n_structures", self.prediction.n_structures),
            ("n_iterations", self.prediction.n_iterations),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, value)| *value < 1) {
            return Err(ConfigError::NonPositive(*name));
        }

        let tools = [
            ("indexer", &self.tools.indexer),
            ("pairwise_search", &self.tools.pairwise_search),
            ("profile_search", &self.tools.profile_search),
            ("aligner", &self.tools.aligner),
            ("predictor", &self.tools.predictor),
        ];
        if let Some((name, _)) = tools.iter().find(|(_, tool)| tool.program.trim().is_empty()) {
            return Err(ConfigError::EmptyToolCommand(*name));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    strategy: Option<AlignmentStrategy>,
    top_hits: Option<usize>,
    search_threads: Option<usize>,
    workers: Option<usize>,
    n_structures: Option<usize>,
    n_iterations: Option<usize>,
    tools: Option<ToolPaths>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(mut self, strategy: AlignmentStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
    pub fn top_hits(mut self, n: usize) -> Self {
        self.top_hits = Some(n);
        self
    }
    pub fn search_threads(mut self, n: usize) -> Self {
        self.search_threads = Some(n);
        self
    }
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = Some(n);
        self
    }
    pub fn n_structures(mut self, n: usize) -> Self {
        self.n_structures = Some(n);
        self
    }
    pub fn n_iterations(mut self, n: usize) -> Self {
        self.n_iterations = Some(n);
        self
    }
    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let config = PipelineConfig {
            strategy: self.strategy.unwrap_or_default(),
            search: SearchConfig {
                top_hits: self.top_hits.unwrap_or(DEFAULT_TOP_HITS),
                threads: self.search_threads.unwrap_or(DEFAULT_SEARCH_THREADS),
            },
            prediction: PredictionConfig {
                workers: self.workers.unwrap_or(DEFAULT_WORKERS),
                n_structures: self.n_structures.unwrap_or(DEFAULT_N_STRUCTURES),
                n_iterations: self.n_iterations.unwrap_or(DEFAULT_N_ITERATIONS),
            },
            tools: self.tools.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}
