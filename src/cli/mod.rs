//! CLI commands module for obskit.

pub mod app;
pub mod commands;

pub use app::{Cli, Commands, ConfigAction};
