//! # msafold Core Library
//!
//! Drives a protein structure prediction pipeline built from external tools: a
//! homology search against a sequence database, a multiple sequence alignment of the
//! query and its best hits, and a long-running structure predictor fed with that
//! alignment.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split throughout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`SequenceRecord`,
//!   `Alignment`, `HitList`), the residue alphabet, the pure top-hit selector, and
//!   readers/writers for the file formats exchanged with the external tools.
//!
//! - **[`engine`]: The Logic Core.** Configuration, errors, progress reporting and the
//!   managed external command that every stage uses to spawn, stream, cancel and
//!   await a tool. Each pipeline stage lives in its own task module.
//!
//! - **[`workflows`]: The Public API.** The linear pipeline and the `Orchestrator`,
//!   which runs one pipeline at a time on a dedicated task and exposes its progress
//!   stream, cancellation and terminal outcome to the caller.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;
