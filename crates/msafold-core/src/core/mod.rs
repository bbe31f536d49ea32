//! # Core Module
//!
//! Stateless building blocks shared by every pipeline stage.
//!
//! - **Sequence Models** ([`models`]) - Records, alignments, hit lists and the residue alphabet
//! - **File I/O** ([`io`]) - FASTA/A3M, the predictor's plain `.aln` format, BLAST XML
//!   results and structural constraint files
//! - **Hit Selection** ([`selection`]) - Deterministic top-N truncation of ranked records
//!
//! Nothing in this module spawns processes or holds state between calls.

pub mod io;
pub mod models;
pub mod selection;
