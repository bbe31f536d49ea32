use crate::cli::CheckAlnArgs;
use crate::error::{CliError, Result};
use msafold::core::io::aln::{AlnError, AlnFile, validate_aln};
use msafold::core::io::traits::SequenceFile;
use tracing::{info, warn};

pub fn run(args: CheckAlnArgs) -> Result<()> {
    info!("Reading alignment from {:?}", &args.path);
    let records = AlnFile::read_from_path(&args.path).map_err(|e| match e {
        AlnError::Io(io) => CliError::Io(io),
        other => CliError::FileParsing {
            path: args.path.clone(),
            source: other.into(),
        },
    })?;

    let report = validate_aln(records)
        .map_err(|e| CliError::Validation(format!("{}: {}", args.path.display(), e)))?;

    if report.has_too_few_unique() {
        warn!(
            "Alignment {:?} has fewer than two unique sequences.",
            &args.path
        );
        println!("Warning: fewer than two unique sequences; the predictor will get no co-evolution signal.");
    }
    println!(
        "✓ {}: {} sequences, width {}, {} unique",
        args.path.display(),
        report.sequences,
        report.width,
        report.unique_sequences
    );
    Ok(())
}
