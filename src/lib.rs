//! axbridge library
//!
//! Exposes the CLI and configuration layers for integration testing.

pub mod cli;
pub mod config;

pub use config::{load_config, BridgeConfig, ConfigError, LoadedConfig};
