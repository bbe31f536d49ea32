//! Readers and writers for the files exchanged with the external tools.
//!
//! FASTA (and its A3M variant) carries sequences between stages, the plain `.aln`
//! format feeds the structure predictor, BLAST XML holds pairwise search results, and
//! constraint files are checked against the query after prediction. The sequence
//! formats share the [`traits::SequenceFile`] interface.

pub mod aln;
pub mod blast_xml;
pub mod constraints;
pub mod fasta;
pub mod traits;
