use crate::core::models::sequence::SequenceRecord;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing sequence collection formats.
///
/// Implementors handle format-specific parsing and serialization; the path-based
/// helpers only wrap the files in buffered readers and writers.
pub trait SequenceFile {
    /// The error type for I/O and parse failures.
    type Error: Error + From<io::Error>;

    /// Reads every record from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<Vec<SequenceRecord>, Self::Error>;

    /// Writes records to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be represented in the format or writing fails.
    fn write_to(records: &[SequenceRecord], writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads every record from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<SequenceRecord>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes records to a file path, replacing any existing file.
    fn write_to_path<P: AsRef<Path>>(
        records: &[SequenceRecord],
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(records, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
