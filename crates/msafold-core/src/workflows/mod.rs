//! # Workflows Module
//!
//! The public API of the library.
//!
//! - [`pipeline`] runs the four stages (database preparation, homology search,
//!   alignment, structure prediction) in order for one query.
//! - [`orchestrator`] drives such a run on its own task, enforces one active run per
//!   orchestrator and per working directory, and hands the caller a [`RunHandle`] for
//!   progress, cancellation and the final [`RunReport`].
//!
//! [`RunHandle`]: orchestrator::RunHandle
//! [`RunReport`]: orchestrator::RunReport

pub mod orchestrator;
pub mod pipeline;
