//! # AeroScan Common Library
//!
//! Shared code for the AeroScan demo services:
//! - Error taxonomy
//! - Layered configuration (CLI, environment, TOML, compiled defaults)
//! - Event types (DemoEvent enum) and the broadcast EventBus
//! - Server-Sent Events helpers
//! - Date/time helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
