use crate::cli::FirstSeqArgs;
use crate::error::{CliError, Result};
use msafold::core::io::fasta::{FastaError, FastaFile, first_record_residues};
use msafold::core::io::traits::SequenceFile;
use std::fs;
use tracing::info;

pub fn run(args: FirstSeqArgs) -> Result<()> {
    let records = FastaFile::read_from_path(&args.path).map_err(|e| match e {
        FastaError::Io(io) => CliError::Io(io),
        other => CliError::FileParsing {
            path: args.path.clone(),
            source: other.into(),
        },
    })?;

    let residues = first_record_residues(&records).ok_or_else(|| {
        CliError::Validation(format!("{} contains no records", args.path.display()))
    })?;

    match &args.output {
        Some(output) => {
            fs::write(output, format!("{}\n", residues))?;
            info!(
                "Wrote {} residues of the first record to {:?}",
                residues.len(),
                output
            );
        }
        None => println!("{}", residues),
    }
    Ok(())
}
