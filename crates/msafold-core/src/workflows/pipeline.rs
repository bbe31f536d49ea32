use crate::core::io::fasta::{FastaError, FastaFile};
use crate::core::io::traits::SequenceFile;
use crate::core::models::alphabet::GAP;
use crate::core::models::hits::HitList;
use crate::core::models::sequence::SequenceRecord;
use crate::engine::config::AlignmentStrategy;
use crate::engine::context::RunContext;
use crate::engine::error::PipelineError;
use crate::engine::state::Stage;
use crate::engine::tasks::alignment::{self, AlignmentInput};
use crate::engine::tasks::{database, homology_search, prediction, profile_search};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const QUERY_FILE: &str = "query.fasta";
const DEFAULT_QUERY_ID: &str = "query";

/// Where the query sequence comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryInput {
    /// A FASTA file, or a file holding the bare residue string.
    File(PathBuf),
    /// Inline text in either of those forms.
    Text(String),
}

/// The query as validated and written into the working directory.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub record: SequenceRecord,
    pub path: PathBuf,
}

/// Parses the query into a single upper-cased record, checks it against the alphabet,
/// and writes it to `<work_dir>/query.fasta`. No external tool is involved.
pub fn prepare_query(input: &QueryInput, work_dir: &Path) -> Result<PreparedQuery, PipelineError> {
    let text = match input {
        QueryInput::File(path) => fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidInput(format!(
                "query file '{}' could not be read: {e}",
                path.display()
            ))
        })?,
        QueryInput::Text(text) => text.clone(),
    };

    let record = parse_query(&text)?;
    let record = record
        .normalized()
        .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
    if let Some(position) = record.residues().find(GAP) {
        return Err(PipelineError::InvalidInput(format!(
            "query '{}' contains a gap at position {position}; it must be ungapped",
            record.id()
        )));
    }

    let path = work_dir.join(QUERY_FILE);
    FastaFile::write_to_path(std::slice::from_ref(&record), &path).map_err(|e| match e {
        FastaError::Io(source) => PipelineError::io(&path, source),
        other => PipelineError::Internal(other.to_string()),
    })?;
    info!(id = record.id(), length = record.len(), "Query prepared.");
    Ok(PreparedQuery { record, path })
}

fn parse_query(text: &str) -> Result<SequenceRecord, PipelineError> {
    let is_fasta = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| line.trim_start().starts_with('>'));

    let record = if is_fasta {
        let mut records = FastaFile::read_from(&mut Cursor::new(text.trim_start()))
            .map_err(|e| PipelineError::InvalidInput(format!("query is not valid FASTA: {e}")))?;
        if records.len() != 1 {
            return Err(PipelineError::InvalidInput(format!(
                "query must contain exactly one sequence, found {}",
                records.len()
            )));
        }
        records.remove(0)
    } else {
        let residues: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        SequenceRecord::new(DEFAULT_QUERY_ID, residues)
    };

    if record.is_empty() {
        return Err(PipelineError::InvalidInput(
            "query sequence is empty".to_string(),
        ));
    }
    Ok(record)
}

/// Runs every stage in order and returns the predictor's output directory.
///
/// Each stage consumes the artifact of the previous one, so there is no overlap and no
/// skipping; a cancelled run stops before the next stage is entered.
#[instrument(skip_all, name = "pipeline_workflow")]
pub async fn run(
    ctx: &RunContext<'_>,
    query: &QueryInput,
    database: &Path,
    output_dir: &Path,
) -> Result<PathBuf, PipelineError> {
    let strategy = ctx.config.strategy;
    info!(strategy = %strategy, work_dir = %ctx.work_dir.display(), "Starting pipeline run.");

    // === Phase 1: Query validation and database preparation ===
    ctx.enter(Stage::Preparing)?;
    let query = prepare_query(query, &ctx.work_dir)?;
    ctx.message(format!(
        "Query '{}' ({} residues)",
        query.record.id(),
        query.record.len()
    ));
    let prepared = database::run(ctx, database).await?;
    ctx.finish(Stage::Preparing);

    // === Phase 2: Homology search ===
    ctx.enter(Stage::Searching)?;
    let searched = match strategy {
        AlignmentStrategy::Direct => {
            let result = homology_search::run(ctx, &query.path, &prepared).await?;
            ctx.message(format!("Top hits: {}", result.hits.len()));
            Searched::Hits(result.hits)
        }
        AlignmentStrategy::FragmentInsertion => {
            let result = profile_search::run(ctx, &query.path, &prepared).await?;
            Searched::Profile(result.a3m_path)
        }
    };
    ctx.finish(Stage::Searching);

    // === Phase 3: Multiple sequence alignment ===
    ctx.enter(Stage::Aligning)?;
    let input = match &searched {
        Searched::Hits(hits) => AlignmentInput::Direct {
            database: &prepared,
            hits,
        },
        Searched::Profile(a3m) => AlignmentInput::FragmentInsertion { a3m },
    };
    let aligned = alignment::run(ctx, &query.record, &query.path, input).await?;
    ctx.finish(Stage::Aligning);

    // === Phase 4: Structure prediction ===
    ctx.enter(Stage::Predicting)?;
    let output = prediction::run(ctx, &aligned.aln_path, output_dir).await?;
    ctx.finish(Stage::Predicting);

    info!(output_dir = %output.display(), "Pipeline run complete.");
    Ok(output)
}

enum Searched {
    Hits(HitList),
    Profile(PathBuf),
}
