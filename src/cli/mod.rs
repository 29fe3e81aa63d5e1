//! CLI module for kek
//!
//! One command per document-store operation. Every command prints a single
//! `{"status":"ok","data":...}` line on success; failures go to stderr as
//! `CODE: message` with a non-zero exit.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{create, delete, find, get, init, repair, run, run_command, update, verify};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{success_envelope, write_response};
