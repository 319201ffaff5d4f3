//! Sleep diary converter CLI library.
//!
//! This crate provides the CLI interface over the format registry.

mod cli;
pub mod commands;
mod config;
pub mod input;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
