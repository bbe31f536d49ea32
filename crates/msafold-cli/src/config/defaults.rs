use msafold::engine::config::{
    self as core_config, AlignmentStrategy, DEFAULT_N_ITERATIONS, DEFAULT_N_STRUCTURES,
    DEFAULT_SEARCH_THREADS, DEFAULT_TOP_HITS, DEFAULT_WORKERS,
};
use std::path::PathBuf;

pub struct DefaultsConfig {
    pub strategy: AlignmentStrategy,
    pub work_dir: PathBuf,
    pub top_hits: usize,
    pub search_threads: usize,
    pub workers: usize,
    pub n_structures: usize,
    pub n_iterations: usize,
    pub tools: core_config::ToolPaths,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            strategy: AlignmentStrategy::default(),
            work_dir: PathBuf::from("."),
            top_hits: DEFAULT_TOP_HITS,
            search_threads: DEFAULT_SEARCH_THREADS,
            workers: DEFAULT_WORKERS,
            n_structures: DEFAULT_N_STRUCTURES,
            n_iterations: DEFAULT_N_ITERATIONS,
            tools: core_config::ToolPaths::default(),
        }
    }
}
