use super::fasta::{FastaError, FastaFile};
use super::traits::SequenceFile;
use crate::core::models::alignment::Alignment;
use crate::core::models::sequence::{SequenceError, SequenceRecord};
use std::collections::HashSet;
use std::io::{self, BufRead, Cursor, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlnError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Fasta(#[from] FastaError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("Alignment has {0} sequence(s); at least 2 are required")]
    TooFewSequences(usize),
}

/// The structure predictor's alignment format: one residue string per line, no headers.
///
/// Reading also accepts FASTA, since alignments are often handed around in that form.
/// Rows read from the plain format are named `row1`, `row2`, ...
pub struct AlnFile;

impl SequenceFile for AlnFile {
    type Error = AlnError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<SequenceRecord>, Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        let is_fasta = content
            .lines()
            .find(|l| !l.trim().is_empty())
            .is_some_and(|l| l.starts_with('>'));
        if is_fasta {
            return Ok(FastaFile::read_from(&mut Cursor::new(content))?);
        }

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .enumerate()
            .map(|(i, row)| SequenceRecord::new(format!("row{}", i + 1), row))
            .collect())
    }

    fn write_to(records: &[SequenceRecord], writer: &mut impl Write) -> Result<(), Self::Error> {
        for record in records {
            let normalized = record.normalized()?;
            writeln!(writer, "{}", normalized.residues())?;
        }
        Ok(())
    }
}

impl AlnFile {
    /// Writes an alignment in the plain format. Nothing is written if any record holds a
    /// symbol outside the alphabet.
    pub fn write_alignment(alignment: &Alignment, writer: &mut impl Write) -> Result<(), AlnError> {
        let rows = alignment.to_plain_rows()?;
        for row in rows {
            writeln!(writer, "{}", row)?;
        }
        Ok(())
    }
}

/// Summary of a successful [`validate_aln`] check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlnReport {
    pub sequences: usize,
    pub width: usize,
    pub unique_sequences: usize,
}

impl AlnReport {
    /// Fewer than two distinct rows carry no co-evolution signal; worth a warning, not
    /// a failure.
    pub fn has_too_few_unique(&self) -> bool {
        self.unique_sequences < 2
    }
}

/// Checks an alignment before it is handed to the predictor: at least two sequences,
/// equal lengths, and every symbol within the alphabet (case-insensitive).
pub fn validate_aln(records: Vec<SequenceRecord>) -> Result<AlnReport, AlnError> {
    if records.len() < 2 {
        return Err(AlnError::TooFewSequences(records.len()));
    }

    let normalized = records
        .iter()
        .map(SequenceRecord::normalized)
        .collect::<Result<Vec<_>, _>>()?;
    let alignment = Alignment::new(normalized)?;

    let unique_sequences = alignment
        .records()
        .iter()
        .map(SequenceRecord::residues)
        .collect::<HashSet<_>>()
        .len();

    Ok(AlnReport {
        sequences: alignment.len(),
        width: alignment.width(),
        unique_sequences,
    })
}
