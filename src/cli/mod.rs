// file: src/cli/mod.rs
// version: 1.0.0
// guid: 0a7d4f21-86c3-49be-b158-e2950c6a3d7f

//! Command line interface for fyrd

pub mod args;
pub mod commands;

pub use args::Cli;
pub use commands::*;
