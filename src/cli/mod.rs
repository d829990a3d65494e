//! Command-line interface

pub mod commands;
pub mod display;
pub mod suite;

pub use commands::{CliArgs, Commands};
