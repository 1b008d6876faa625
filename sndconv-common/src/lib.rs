//! # sndconv Common Library
//!
//! Shared code for the sndconv workspace:
//! - Bootstrap configuration loading (TOML, graceful degradation)
//! - Logging initialization
//! - Common error type

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
