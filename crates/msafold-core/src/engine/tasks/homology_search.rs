use super::database::PreparedDatabase;
use crate::core::io::blast_xml::{self, BlastXmlError};
use crate::core::models::hits::HitList;
use crate::engine::command::ManagedCommand;
use crate::engine::config::search;
use crate::engine::context::RunContext;
use crate::engine::error::PipelineError;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const RESULT_FILE: &str = "query.blast.xml";
pub const HITS_FILE: &str = "hits.tsv";

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub hits: HitList,
    pub xml_path: PathBuf,
    pub hits_path: PathBuf,
}

/// Runs a pairwise search of `query` against a BLAST database and keeps the first
/// `top_hits` distinct subjects in the tool's rank order.
#[instrument(skip_all, name = "homology_search_task")]
pub async fn run(
    ctx: &RunContext<'_>,
    query: &Path,
    database: &PreparedDatabase,
) -> Result<SearchResult, PipelineError> {
    let xml_path = ctx.artifact(RESULT_FILE);
    let threads = ctx.config.search.threads.to_string();

    let command = ManagedCommand::new(&ctx.config.tools.pairwise_search)
        .arg("-query")
        .arg(query)
        .arg("-db")
        .arg(database.prefix())
        .args(["-evalue", search::BLASTP_EVALUE])
        .args(["-outfmt", search::BLASTP_OUTFMT])
        .arg("-out")
        .arg(&xml_path)
        .args(["-num_threads", threads.as_str()]);
    ctx.run_tool(command, PipelineError::Search).await?;

    let iterations = blast_xml::read_hit_ids_from_path(&xml_path).map_err(|e| {
        PipelineError::SearchOutput {
            path: xml_path.clone(),
            reason: match e {
                BlastXmlError::Io(e) => format!("result file could not be read: {e}"),
                BlastXmlError::Malformed(e) => e.to_string(),
            },
        }
    })?;

    let top_hits = ctx.config.search.top_hits;
    let hits = HitList::from_ranked_ids(iterations.into_iter().flatten(), top_hits);
    info!(found = hits.len(), requested = top_hits, "Parsed search hits.");
    if hits.len() < top_hits {
        ctx.message(format!(
            "Search returned {} hit(s); fewer than the {} requested",
            hits.len(),
            top_hits
        ));
    }

    let hits_path = ctx.artifact(HITS_FILE);
    let file = File::create(&hits_path).map_err(|e| PipelineError::io(&hits_path, e))?;
    hits.write_tsv(BufWriter::new(file))
        .map_err(|e| PipelineError::io(&hits_path, e))?;

    if hits.is_empty() {
        return Err(PipelineError::InvalidInput(
            "the search found no homologous sequences".to_string(),
        ));
    }

    Ok(SearchResult {
        hits,
        xml_path,
        hits_path,
    })
}
