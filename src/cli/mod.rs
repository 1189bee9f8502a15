//! CLI module for dripfeed - command-line interface and subcommands.
//!
//! Provides the daemon entry point, one-shot runs, candidate preview, and
//! session history.

pub mod commands;

pub use commands::Cli;
