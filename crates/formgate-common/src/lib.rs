//! # Formgate Common
//!
//! Shared types, errors, and constants used across Formgate components.
//!
//! ## Modules
//! - `types` - Core data structures (FormPolicy, VerificationResult)
//! - `error` - Common error type
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::GateError;
pub use types::*;
