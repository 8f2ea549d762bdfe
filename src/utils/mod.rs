//! Utilities Module
//!
//! Hashing and hex helpers, structured logging, and verification settings.

pub mod crypto;
pub mod logging;
pub mod security_config;

pub use crypto::*;
