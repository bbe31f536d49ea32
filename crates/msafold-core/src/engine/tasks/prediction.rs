use crate::engine::command::ManagedCommand;
use crate::engine::context::RunContext;
use crate::engine::error::{PipelineError, ToolFailure};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, instrument};

/// Runs the structure predictor on `aln` and returns `output_dir`.
///
/// This is the long-running stage; its merged output reaches the caller line by line
/// through the run's progress stream while it runs. A clean exit only counts as success
/// if the predictor created or rewrote at least one entry in `output_dir`; models left
/// over from an earlier run do not.
#[instrument(skip_all, name = "prediction_task")]
pub async fn run(
    ctx: &RunContext<'_>,
    aln: &Path,
    output_dir: &Path,
) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;
    let before = snapshot(output_dir)?;

    let params = &ctx.config.prediction;
    let command = ManagedCommand::new(&ctx.config.tools.predictor)
        .arg(aln)
        .arg(output_dir)
        .arg(params.workers.to_string())
        .arg(params.n_structures.to_string())
        .arg(params.n_iterations.to_string());
    let summary = ctx.run_tool(command, PipelineError::Prediction).await?;

    let produced = snapshot(output_dir)?
        .into_iter()
        .filter(|(name, stamp)| before.get(name) != Some(stamp))
        .count();
    if produced == 0 {
        return Err(PipelineError::Prediction(ToolFailure {
            tool: ctx.config.tools.predictor.program.clone(),
            exit_code: Some(0),
            log_path: summary.log_path,
            tail: summary.tail,
            detail: Some(format!(
                "no new output was written to '{}'",
                output_dir.display()
            )),
        }));
    }

    info!(output_dir = %output_dir.display(), files = produced, "Prediction finished.");
    Ok(output_dir.to_path_buf())
}

/// Size and modification time of an entry, used to tell fresh output from stale.
type Stamp = (u64, Option<SystemTime>);

fn snapshot(dir: &Path) -> Result<HashMap<OsString, Stamp>, PipelineError> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    Ok(entries
        .filter_map(Result::ok)
        .map(|entry| {
            let stamp = entry
                .metadata()
                .map(|m| (m.len(), m.modified().ok()))
                .unwrap_or((0, None));
            (entry.file_name(), stamp)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{PipelineConfigBuilder, ToolCommand, ToolPaths};
    use crate::engine::progress::{Progress, ProgressReporter};
    use crate::testing;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio::sync::watch;

    async fn predict_with(
        dir: &Path,
        predictor: ToolCommand,
        lines: Arc<Mutex<Vec<String>>>,
    ) -> Result<PathBuf, PipelineError> {
        let config = PipelineConfigBuilder::new()
            .workers(2)
            .n_structures(3)
            .n_iterations(1)
            .tools(ToolPaths {
                predictor,
                ..ToolPaths::default()
            })
            .build()
            .unwrap();
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            if let Progress::ToolOutput { line, .. } = event {
                lines.lock().unwrap().push(line);
            }
        }));
        let (_tx, rx) = watch::channel(false);
        let ctx = RunContext::new(dir.join("work"), &config, &reporter, rx).unwrap();
        let aln = ctx.artifact("query.aln");
        fs::write(&aln, "MKV\nMKA\n").unwrap();
        run(&ctx, &aln, &dir.join("work/predictions")).await
    }

    #[tokio::test]
    async fn predictor_receives_its_positional_arguments_and_streams_output() {
        let dir = TempDir::new().unwrap();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let out = predict_with(dir.path(), testing::predictor(dir.path()), Arc::clone(&lines))
            .await
            .unwrap();

        let args = fs::read_to_string(out.join("arguments.txt")).unwrap();
        assert!(args.trim_end().ends_with("predictions 2 3 1"));
        assert_eq!(fs::read_to_string(out.join("input.aln")).unwrap(), "MKV\nMKA\n");
        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "predicting distances");
    }

    #[tokio::test]
    async fn exiting_cleanly_without_output_is_a_prediction_error() {
        let dir = TempDir::new().unwrap();
        let err = predict_with(
            dir.path(),
            testing::silent_predictor(dir.path()),
            Arc::new(Mutex::new(Vec::new())),
        )
        .await
        .unwrap_err();
        let failure = err.tool_failure().unwrap();
        assert_eq!(failure.exit_code, Some(0));
        assert!(failure.detail.as_deref().unwrap().contains("no new output"));
    }

    #[tokio::test]
    async fn models_left_from_an_earlier_run_do_not_count_as_output() {
        let dir = TempDir::new().unwrap();
        let predictions = dir.path().join("work/predictions");
        fs::create_dir_all(&predictions).unwrap();
        fs::write(predictions.join("model_1.pdb"), "MODEL 1\n").unwrap();

        let err = predict_with(
            dir.path(),
            testing::silent_predictor(dir.path()),
            Arc::new(Mutex::new(Vec::new())),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Prediction(_)));
        let failure = err.tool_failure().unwrap();
        assert_eq!(failure.exit_code, Some(0));
        assert!(failure.detail.as_deref().unwrap().contains("no new output"));
        assert!(predictions.join("model_1.pdb").exists());
    }

    #[tokio::test]
    async fn rerunning_into_a_populated_directory_succeeds_when_the_predictor_writes() {
        let dir = TempDir::new().unwrap();
        let predictions = dir.path().join("work/predictions");
        fs::create_dir_all(&predictions).unwrap();
        fs::write(predictions.join("model_1.pdb"), "MODEL 1\n").unwrap();

        let out = predict_with(
            dir.path(),
            testing::predictor(dir.path()),
            Arc::new(Mutex::new(Vec::new())),
        )
        .await
        .unwrap();
        assert!(out.join("arguments.txt").exists());
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_prediction_error() {
        let dir = TempDir::new().unwrap();
        let err = predict_with(
            dir.path(),
            testing::failing_tool(dir.path(), "run_ProFOLD", 137),
            Arc::new(Mutex::new(Vec::new())),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Prediction(_)));
    }
}
