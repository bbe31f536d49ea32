//! Sequence-level data models.
//!
//! Records are parsed at stage entry, held in memory only for the duration of a stage
//! and never edited in place; transformations build new values.

pub mod alignment;
pub mod alphabet;
pub mod hits;
pub mod sequence;
