//! One module per pipeline stage.
//!
//! Every task takes the [`RunContext`](super::context::RunContext) of the current run,
//! launches its external tool through the managed command, and turns the tool's output
//! files into the input of the next stage. Tool failures are wrapped into the stage's
//! error class at this boundary.

pub mod alignment;
pub mod database;
pub mod homology_search;
pub mod prediction;
pub mod profile_search;
