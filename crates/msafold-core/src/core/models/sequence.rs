use super::alphabet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Invalid symbol '{symbol}' at position {position} of sequence '{id}'")]
    InvalidResidue {
        id: String,
        position: usize,
        symbol: char,
    },

    #[error("Sequence '{0}' has no residues")]
    EmptySequence(String),

    #[error(
        "Sequence '{id}' has length {found}, but the alignment width is {expected}"
    )]
    RaggedAlignment {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("An alignment must contain at least one sequence")]
    EmptyAlignment,
}

/// A single named residue string as found in a FASTA/A3M file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    id: String,
    description: String,
    residues: String,
}

impl SequenceRecord {
    pub fn new(id: impl Into<String>, residues: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            residues: residues.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builds a record from a FASTA header line (without the leading `>`): the first
    /// whitespace-delimited token is the identifier, the rest the description.
    pub fn from_header(header: &str, residues: impl Into<String>) -> Self {
        let header = header.trim();
        let (id, description) = match header.split_once(char::is_whitespace) {
            Some((id, rest)) => (id, rest.trim()),
            None => (header, ""),
        };
        Self::new(id, residues).with_description(description)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn residues(&self) -> &str {
        &self.residues
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// The header line as written back to FASTA, without the leading `>`.
    pub fn header(&self) -> String {
        if self.description.is_empty() {
            self.id.clone()
        } else {
            format!("{} {}", self.id, self.description)
        }
    }

    /// Returns a new record with residues upper-cased and checked against the alphabet.
    pub fn normalized(&self) -> Result<Self, SequenceError> {
        let residues = self.residues.to_ascii_uppercase();
        alphabet::validate(&residues).map_err(|invalid| SequenceError::InvalidResidue {
            id: self.id.clone(),
            position: invalid.position,
            symbol: invalid.symbol,
        })?;
        Ok(Self {
            id: self.id.clone(),
            description: self.description.clone(),
            residues,
        })
    }

    /// Number of non-gap residues.
    pub fn ungapped_len(&self) -> usize {
        self.residues
            .chars()
            .filter(|&c| c != alphabet::GAP)
            .count()
    }
}

impl fmt::Display for SequenceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} residues)", self.id, self.residues.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_header_splits_identifier_and_description() {
        let record = SequenceRecord::from_header("sp|P69905|HBA_HUMAN Hemoglobin alpha", "MVL");
        assert_eq!(record.id(), "sp|P69905|HBA_HUMAN");
        assert_eq!(record.description(), "Hemoglobin alpha");
        assert_eq!(record.header(), "sp|P69905|HBA_HUMAN Hemoglobin alpha");
    }

    #[test]
    fn from_header_without_description_keeps_bare_identifier() {
        let record = SequenceRecord::from_header("  seq1  ", "MVL");
        assert_eq!(record.id(), "seq1");
        assert_eq!(record.description(), "");
        assert_eq!(record.header(), "seq1");
    }

    #[test]
    fn normalized_upper_cases_valid_residues() {
        let record = SequenceRecord::new("q", "mkv-l");
        let normalized = record.normalized().unwrap();
        assert_eq!(normalized.residues(), "MKV-L");
        assert_eq!(record.residues(), "mkv-l");
    }

    #[test]
    fn normalized_rejects_symbols_outside_the_alphabet() {
        let record = SequenceRecord::new("q", "MKV1");
        assert_eq!(
            record.normalized(),
            Err(SequenceError::InvalidResidue {
                id: "q".into(),
                position: 3,
                symbol: '1'
            })
        );
    }

    #[test]
    fn ungapped_len_ignores_gaps() {
        assert_eq!(SequenceRecord::new("q", "M-K--V").ungapped_len(), 3);
    }
}
