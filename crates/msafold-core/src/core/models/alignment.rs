use super::sequence::{SequenceError, SequenceRecord};
use crate::core::selection::select_top_hits;

/// A multiple sequence alignment: a non-empty, ordered set of records that all share the
/// same residue-string length. The first record is the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    records: Vec<SequenceRecord>,
    width: usize,
}

impl Alignment {
    /// Builds an alignment, rejecting empty input and records whose length differs from
    /// the first record's.
    pub fn new(records: Vec<SequenceRecord>) -> Result<Self, SequenceError> {
        let width = records
            .first()
            .map(SequenceRecord::len)
            .ok_or(SequenceError::EmptyAlignment)?;

        if let Some(ragged) = records.iter().find(|r| r.len() != width) {
            return Err(SequenceError::RaggedAlignment {
                id: ragged.id().to_string(),
                expected: width,
                found: ragged.len(),
            });
        }

        Ok(Self { records, width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of records, query included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }

    pub fn query(&self) -> &SequenceRecord {
        &self.records[0]
    }

    /// Returns a new alignment holding the query followed by at most `k` hits.
    pub fn top_hits(&self, k: usize) -> Self {
        let records = select_top_hits(&self.records, k).with_query();
        Self {
            records,
            width: self.width,
        }
    }

    /// Renders the predictor's plain format: one upper-cased residue string per line,
    /// headers stripped. Fails on the first symbol outside the alphabet.
    pub fn to_plain_rows(&self) -> Result<Vec<String>, SequenceError> {
        self.records
            .iter()
            .map(|record| record.normalized().map(|r| r.residues().to_string()))
            .collect()
    }
}
