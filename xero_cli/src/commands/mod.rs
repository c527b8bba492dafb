//! CLI subcommand implementations.

pub mod call;
