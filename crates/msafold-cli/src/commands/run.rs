use crate::cli::RunArgs;
use crate::config;
use crate::error::{CliError, Result};
use crate::ui::UiEvent;
use msafold::workflows::orchestrator::{Orchestrator, RunOutcome};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn run(args: RunArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = config::build_config(&args)?;
    info!(
        "Strategy '{}', working directory {:?}",
        app_config.core_config.strategy, &app_config.work_dir
    );

    let orchestrator = Orchestrator::new();
    let mut handle = orchestrator.start(app_config.into_request())?;

    let cancel = handle.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling the run...");
            cancel.cancel();
        }
    });

    println!("Starting pipeline run {}...", handle.id());
    while let Some(event) = handle.next_event().await {
        if ui_sender.send(UiEvent::Progress(event)).await.is_err() {
            warn!("UI channel closed; progress is no longer displayed.");
            break;
        }
    }

    let report = handle.wait().await;
    interrupt.abort();
    info!(
        "Run {} ended as {} after {} log line(s).",
        report.id,
        report.outcome.state(),
        report.log.len()
    );

    match report.outcome {
        RunOutcome::Completed(output_dir) => {
            println!("✓ Predicted structures written to: {}", output_dir.display());
            Ok(())
        }
        RunOutcome::Failed(e) => {
            error!("Pipeline failed ({:?}): {}", e.kind(), e);
            Err(CliError::Pipeline(e))
        }
        RunOutcome::Aborted => Err(CliError::Aborted),
    }
}
