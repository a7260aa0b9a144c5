//! Command-line entry point, configuration and wiring
//!
//! This crate provides the `courtwatch` binary.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
