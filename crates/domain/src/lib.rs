//! # notaryflow Domain
//!
//! Business domain types for batch notarization of macOS artifacts.
//!
//! This crate contains:
//! - Artifact, submission, status and ticket types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants (tool markers, defaults)
//!
//! ## Architecture
//! - No dependencies on other notaryflow crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
