use super::database::PreparedDatabase;
use crate::engine::command::ManagedCommand;
use crate::engine::config::search;
use crate::engine::context::RunContext;
use crate::engine::error::PipelineError;
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const A3M_FILE: &str = "query.a3m";
pub const HHR_FILE: &str = "query.hhr";

#[derive(Debug, Clone)]
pub struct ProfileSearchResult {
    /// The query followed by its gapped homologs, in the tool's rank order.
    pub a3m_path: PathBuf,
    pub hhr_path: PathBuf,
}

/// Runs an iterative profile search of `query` against an HH-suite database.
#[instrument(skip_all, name = "profile_search_task")]
pub async fn run(
    ctx: &RunContext<'_>,
    query: &Path,
    database: &PreparedDatabase,
) -> Result<ProfileSearchResult, PipelineError> {
    let a3m_path = ctx.artifact(A3M_FILE);
    let hhr_path = ctx.artifact(HHR_FILE);

    let command = ManagedCommand::new(&ctx.config.tools.profile_search)
        .arg("-i")
        .arg(query)
        .arg("-d")
        .arg(database.prefix())
        .arg("-oa3m")
        .arg(&a3m_path)
        .arg("-o")
        .arg(&hhr_path)
        .args(["-n", search::HHBLITS_ITERATIONS])
        .args(["-e", search::HHBLITS_EVALUE])
        .args(["-maxseq", search::HHBLITS_MAX_SEQUENCES]);
    ctx.run_tool(command, PipelineError::Search).await?;

    if !a3m_path.is_file() {
        return Err(PipelineError::SearchOutput {
            path: a3m_path,
            reason: "the profile search did not write its alignment".to_string(),
        });
    }

    Ok(ProfileSearchResult { a3m_path, hhr_path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{PipelineConfigBuilder, ToolCommand, ToolPaths};
    use crate::engine::progress::ProgressReporter;
    use crate::testing;
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::watch;

    async fn search_with(dir: &Path, tool: ToolCommand) -> Result<ProfileSearchResult, PipelineError> {
        let config = PipelineConfigBuilder::new()
            .tools(ToolPaths {
                profile_search: tool,
                ..ToolPaths::default()
            })
            .build()
            .unwrap();
        let reporter = ProgressReporter::new();
        let (_tx, rx) = watch::channel(false);
        let ctx = RunContext::new(dir.join("work"), &config, &reporter, rx).unwrap();
        let query = ctx.artifact("query.fasta");
        fs::write(&query, ">query\nMKVLAG\n").unwrap();
        let database = PreparedDatabase::HhSuite {
            prefix: dir.join("uniclust30"),
        };
        run(&ctx, &query, &database).await
    }

    #[tokio::test]
    async fn a3m_starts_with_the_query_and_holds_the_homologs() {
        let dir = TempDir::new().unwrap();
        let homologs = vec![("h1".to_string(), "MKvLAG".to_string())];
        let result = search_with(dir.path(), testing::hhblits(dir.path(), &homologs))
            .await
            .unwrap();

        let a3m = fs::read_to_string(&result.a3m_path).unwrap();
        assert_eq!(a3m, ">query\nMKVLAG\n>h1\nMKvLAG\n");
        assert!(result.hhr_path.is_file());
        let log = fs::read_to_string(dir.path().join("work/logs/hhblits.log")).unwrap();
        assert!(log.contains("-maxseq 500"));
    }

    #[tokio::test]
    async fn tool_failure_is_a_search_error() {
        let dir = TempDir::new().unwrap();
        let err = search_with(dir.path(), testing::failing_tool(dir.path(), "hhblits", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Search(_)));
    }
}
