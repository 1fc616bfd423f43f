//! # Formgate
//!
//! Server-side CAPTCHA verification gate for web forms.
//!
//! ## Modules
//! - `gate` - Replay guard, siteverify client, and policy evaluator
//! - `store` - Expiring key-value stores (Redis, in-memory)
//! - `config` - Layered configuration
//! - `routes` - HTTP surface for form-submission handlers
//! - `state` - Shared application state

pub mod config;
pub mod gate;
pub mod routes;
pub mod state;
pub mod store;
