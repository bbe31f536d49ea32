//! Execution machinery shared by every pipeline stage.
//!
//! [`config`] holds the immutable run configuration, [`command`] the managed external
//! command through which every tool is spawned, streamed, cancelled and awaited, and
//! [`tasks`] one module per stage built on top of both.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod state;
pub mod tasks;
