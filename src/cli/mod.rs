// src/cli/mod.rs
//! Command-line interface
//!
//! clap definitions for the `start`, `benchmark` and `config` subcommands.

/// Argument structures for every subcommand
pub mod commands;

pub use commands::{Action, BenchmarkOptions, Commands, ConfigOptions, StartOptions};
