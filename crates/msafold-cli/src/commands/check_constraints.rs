use crate::cli::CheckConstraintsArgs;
use crate::error::{CliError, Result};
use msafold::core::io::constraints::check_constraints;
use msafold::core::io::fasta::{FastaError, FastaFile};
use msafold::core::io::traits::SequenceFile;
use msafold::core::models::sequence::SequenceRecord;
use std::fs::File;
use std::io::{self, BufReader};
use tracing::{info, warn};

pub fn run(args: CheckConstraintsArgs) -> Result<()> {
    let query_len = FastaFile::read_from_path(&args.query)
        .map_err(|e| match e {
            FastaError::Io(io) => CliError::Io(io),
            other => CliError::FileParsing {
                path: args.query.clone(),
                source: other.into(),
            },
        })?
        .first()
        .map(SequenceRecord::ungapped_len)
        .ok_or_else(|| {
            CliError::Validation(format!("{} contains no records", args.query.display()))
        })?;
    info!("Checking {:?} against a query of {} residues", &args.constraints, query_len);

    let reader = BufReader::new(File::open(&args.constraints)?);
    let report = check_constraints(reader, query_len)?;

    let counts = report.counts;
    println!(
        "{}: {} AtomPair, {} Angle, {} Dihedral, {} other",
        args.constraints.display(),
        counts.atom_pair,
        counts.angle,
        counts.dihedral,
        counts.other
    );

    if report.is_clean() {
        println!("✓ All constraints are within the query's 1..={} residues.", query_len);
        return Ok(());
    }

    warn!("{} problematic constraint line(s) found.", report.issues.len());
    report.write_issues_tsv(io::stdout().lock())?;
    Err(CliError::Validation(format!(
        "{} of the constraints in {} are invalid",
        report.issues.len(),
        args.constraints.display()
    )))
}
