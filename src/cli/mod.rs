//! Thin demonstration command-line front end over the library's public
//! entry points: `ingest`, `query`, `drift`, `purge`, all backed by the
//! `SQLite` reference store.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
