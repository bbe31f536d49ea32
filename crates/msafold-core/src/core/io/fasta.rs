use super::traits::SequenceFile;
use crate::core::models::alphabet;
use crate::core::models::sequence::SequenceRecord;
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const LINE_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: FastaParseErrorKind },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FastaParseErrorKind {
    #[error("Sequence data found before the first '>' header")]
    DataBeforeHeader,
    #[error("Header line has no identifier")]
    EmptyHeader,
}

/// FASTA, including A3M files (FASTA with lower-case insertion states).
pub struct FastaFile;

impl SequenceFile for FastaFile {
    type Error = FastaError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<SequenceRecord>, Self::Error> {
        Records::new(reader).collect()
    }

    fn write_to(records: &[SequenceRecord], writer: &mut impl Write) -> Result<(), Self::Error> {
        for record in records {
            writeln!(writer, ">{}", record.header())?;
            let residues = record.residues().as_bytes();
            for chunk in residues.chunks(LINE_WIDTH) {
                writer.write_all(chunk)?;
                writer.write_all(b"\n")?;
            }
        }
        Ok(())
    }
}

/// Streaming record iterator over a FASTA/A3M source.
///
/// `#` lines ahead of the first record (A3M metadata) and blank lines are skipped.
pub struct Records<R> {
    reader: R,
    line: String,
    line_num: usize,
    pending_header: Option<String>,
    finished: bool,
}

impl<R: BufRead> Records<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_num: 0,
            pending_header: None,
            finished: false,
        }
    }

    fn next_line(&mut self) -> Result<Option<&str>, FastaError> {
        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            return Ok(None);
        }
        self.line_num += 1;
        Ok(Some(self.line.trim_end_matches(['\n', '\r'])))
    }

    fn read_record(&mut self) -> Result<Option<SequenceRecord>, FastaError> {
        let header = match self.pending_header.take() {
            Some(header) => header,
            None => loop {
                let line_num = self.line_num + 1;
                match self.next_line()? {
                    None => return Ok(None),
                    Some(line) if line.trim().is_empty() || line.starts_with('#') => continue,
                    Some(line) => match line.strip_prefix('>') {
                        Some(header) => break header.to_string(),
                        None => {
                            return Err(FastaError::Parse {
                                line: line_num,
                                kind: FastaParseErrorKind::DataBeforeHeader,
                            });
                        }
                    },
                }
            },
        };

        if header.trim().is_empty() {
            return Err(FastaError::Parse {
                line: self.line_num,
                kind: FastaParseErrorKind::EmptyHeader,
            });
        }

        let mut residues = String::new();
        while let Some(line) = self.next_line()? {
            if let Some(next_header) = line.strip_prefix('>') {
                let next_header = next_header.to_string();
                self.pending_header = Some(next_header);
                break;
            }
            residues.extend(line.chars().filter(|c| !c.is_whitespace()));
        }

        Ok(Some(SequenceRecord::from_header(&header, residues)))
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<SequenceRecord, FastaError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Streams `reader` and keeps the records whose identifier is in `ids`, in source order.
pub fn extract_by_ids(
    reader: impl BufRead,
    ids: &HashSet<&str>,
) -> Result<Vec<SequenceRecord>, FastaError> {
    let mut extracted = Vec::new();
    for record in Records::new(reader) {
        let record = record?;
        if ids.contains(record.id()) {
            extracted.push(record);
        }
    }
    Ok(extracted)
}

/// The match-state residues of the first record: upper-case letters only, with
/// insertion states and gaps removed.
pub fn first_record_residues(records: &[SequenceRecord]) -> Option<String> {
    records
        .first()
        .map(|record| alphabet::match_states(record.residues()))
}
