//! Command-line interface
//!
//! Thin commands over the library: each loads a report definition (and the
//! layered engine settings), runs one engine operation and prints or writes
//! the result.

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::Output;
