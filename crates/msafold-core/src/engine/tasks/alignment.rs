use super::database::PreparedDatabase;
use crate::core::io::aln::AlnFile;
use crate::core::io::fasta::{self, FastaError, FastaFile};
use crate::core::io::traits::SequenceFile;
use crate::core::models::alignment::Alignment;
use crate::core::models::hits::HitList;
use crate::core::models::sequence::SequenceRecord;
use crate::core::selection::select_top_hits;
use crate::engine::command::ManagedCommand;
use crate::engine::context::RunContext;
use crate::engine::error::PipelineError;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const HITS_FASTA: &str = "hits.fasta";
pub const DIRECT_OUTPUT: &str = "aligned.fasta";
pub const FRAGMENT_OUTPUT: &str = "query.msa.fasta";
pub const ALN_FILE: &str = "query.aln";

/// What the alignment stage consumes; each strategy has its own upstream artifacts.
#[derive(Debug, Clone, Copy)]
pub enum AlignmentInput<'a> {
    /// Hits of a pairwise search, to be extracted from the database and aligned from
    /// scratch together with the query.
    Direct {
        database: &'a PreparedDatabase,
        hits: &'a HitList,
    },
    /// Gapped homologs from a profile search, to be inserted into the query's columns.
    FragmentInsertion { a3m: &'a Path },
}

#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub alignment: Alignment,
    /// The aligner's FASTA output.
    pub msa_path: PathBuf,
    /// The plain, header-less rendering handed to the predictor.
    pub aln_path: PathBuf,
}

#[instrument(skip_all, name = "alignment_task")]
pub async fn run(
    ctx: &RunContext<'_>,
    query: &SequenceRecord,
    query_path: &Path,
    input: AlignmentInput<'_>,
) -> Result<AlignmentResult, PipelineError> {
    let msa_path = match input {
        AlignmentInput::Direct { database, hits } => {
            align_from_scratch(ctx, query, database, hits).await?
        }
        AlignmentInput::FragmentInsertion { a3m } => insert_fragments(ctx, query_path, a3m).await?,
    };

    let alignment = read_alignment(&msa_path, query.len())?;
    info!(
        sequences = alignment.len(),
        width = alignment.width(),
        "Alignment ready."
    );
    ctx.message(format!(
        "Alignment complete: {} sequences, width {}",
        alignment.len(),
        alignment.width()
    ));

    let aln_path = ctx.artifact(ALN_FILE);
    write_plain(&alignment, &msa_path, &aln_path)?;

    Ok(AlignmentResult {
        alignment,
        msa_path,
        aln_path,
    })
}

async fn align_from_scratch(
    ctx: &RunContext<'_>,
    query: &SequenceRecord,
    database: &PreparedDatabase,
    hits: &HitList,
) -> Result<PathBuf, PipelineError> {
    let db_fasta = database.fasta().ok_or_else(|| {
        PipelineError::Internal("from-scratch alignment needs a FASTA database".to_string())
    })?;

    let file = File::open(db_fasta).map_err(|e| PipelineError::io(db_fasta, e))?;
    let mut extracted = fasta::extract_by_ids(BufReader::new(file), &hits.ids())
        .map_err(|e| match e {
            FastaError::Io(e) => PipelineError::io(db_fasta, e),
            parse => PipelineError::InvalidInput(format!(
                "database '{}' is not valid FASTA: {parse}",
                db_fasta.display()
            )),
        })?;
    if extracted.is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "none of the {} hit(s) were found in '{}'",
            hits.len(),
            db_fasta.display()
        )));
    }

    // Back to search rank order; extraction follows database order.
    extracted.sort_by_key(|record| {
        hits.iter()
            .find(|hit| hit.id == record.id())
            .map_or(usize::MAX, |hit| hit.rank)
    });
    ctx.message(format!("Extracted {} hit sequence(s)", extracted.len()));

    let mut records = Vec::with_capacity(extracted.len() + 1);
    records.push(query.clone());
    records.extend(extracted);

    let input_path = ctx.artifact(HITS_FASTA);
    FastaFile::write_to_path(&records, &input_path).map_err(|e| fasta_write_error(&input_path, e))?;

    let output_path = ctx.artifact(DIRECT_OUTPUT);
    let command = ManagedCommand::new(&ctx.config.tools.aligner)
        .arg(&input_path)
        .stdout_to(&output_path);
    ctx.run_tool(command, PipelineError::Alignment).await?;
    Ok(output_path)
}

async fn insert_fragments(
    ctx: &RunContext<'_>,
    query_path: &Path,
    a3m: &Path,
) -> Result<PathBuf, PipelineError> {
    let records = FastaFile::read_from_path(a3m).map_err(|e| PipelineError::SearchOutput {
        path: a3m.to_path_buf(),
        reason: e.to_string(),
    })?;

    let top = select_top_hits(&records, ctx.config.search.top_hits);
    if top.hits.is_empty() {
        return Err(PipelineError::InvalidInput(
            "the profile search found no homologous sequences".to_string(),
        ));
    }
    ctx.message(format!(
        "Keeping {} of {} sequences",
        top.hits.len(),
        records.len()
    ));

    let fragments_path = ctx.artifact(format!("query_top{}.a3m", top.hits.len()));
    FastaFile::write_to_path(top.hits, &fragments_path)
        .map_err(|e| fasta_write_error(&fragments_path, e))?;

    let output_path = ctx.artifact(FRAGMENT_OUTPUT);
    let command = ManagedCommand::new(&ctx.config.tools.aligner)
        .arg("--auto")
        .arg("--addfragments")
        .arg(&fragments_path)
        .arg("--keeplength")
        .arg(query_path)
        .stdout_to(&output_path);
    ctx.run_tool(command, PipelineError::Alignment).await?;
    Ok(output_path)
}

/// Parses the aligner's output and checks it can feed the predictor: equal row lengths
/// and at least one column per query residue.
fn read_alignment(path: &Path, query_len: usize) -> Result<Alignment, PipelineError> {
    let unusable = |reason: String| PipelineError::AlignmentOutput {
        path: path.to_path_buf(),
        reason,
    };

    let records = FastaFile::read_from_path(path).map_err(|e| unusable(e.to_string()))?;
    let alignment = Alignment::new(records).map_err(|e| unusable(e.to_string()))?;
    if alignment.width() < query_len {
        return Err(unusable(format!(
            "alignment width {} is shorter than the query ({} residues)",
            alignment.width(),
            query_len
        )));
    }
    Ok(alignment)
}

fn write_plain(alignment: &Alignment, msa_path: &Path, aln_path: &Path) -> Result<(), PipelineError> {
    let mut buffer = Vec::new();
    AlnFile::write_alignment(alignment, &mut buffer).map_err(|e| PipelineError::AlignmentOutput {
        path: msa_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(aln_path, buffer).map_err(|e| PipelineError::io(aln_path, e))
}

fn fasta_write_error(path: &Path, e: FastaError) -> PipelineError {
    match e {
        FastaError::Io(source) => PipelineError::io(path, source),
        other => PipelineError::Internal(other.to_string()),
    }
}
