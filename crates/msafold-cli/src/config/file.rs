use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSearchConfig {
    pub top_hits: Option<usize>,
    pub threads: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FilePredictionConfig {
    pub workers: Option<usize>,
    pub n_structures: Option<usize>,
    pub n_iterations: Option<usize>,
}

/// Tool command lines, each a program followed by optional leading arguments.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileToolsConfig {
    pub indexer: Option<String>,
    pub pairwise_search: Option<String>,
    pub profile_search: Option<String>,
    pub aligner: Option<String>,
    pub predictor: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub strategy: Option<String>,
    pub work_dir: Option<PathBuf>,
    pub search: Option<FileSearchConfig>,
    pub prediction: Option<FilePredictionConfig>,
    pub tools: Option<FileToolsConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
