//! # driftwatch
//!
//! HTTP service and command-line interface for OKR drift analysis.

pub mod config;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::Config;
pub use state::{AppState, Backends};
