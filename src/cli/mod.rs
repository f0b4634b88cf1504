//! CLI module for corpusdb
//!
//! Provides command-line access to:
//! - build: build every index of a corpus manifest
//! - resolve: locate one chunk
//! - read: print one chunk
//! - strategies: list index strategies

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, CorpusArgs};
pub use commands::{build, read, resolve, run, run_command, run_command_to, strategies};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
