//! Command-line front end for grid subsetting.
//!
//! Loads the model registry, resolves a request against a model's defaults
//! and runs the subset on the blocking pool under a timeout.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command, FetchArgs};
pub use commands::FetchOutcome;
