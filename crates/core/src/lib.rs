//! curator-core
//!
//! Core library for curating datasets of fragment shader programs.
//!
//! This crate defines the program model, a fault-tolerant GLSL parser with the
//! function/comment association built on it, the crash-isolated execution
//! harness (validator, sandbox, classifier), dataset annotation, and the
//! configuration and outcome ledger those services share.
//!
//! All substantive logic lives here so it is testable and reusable from
//! multiple frontends.

pub mod model;
pub mod parser;
pub mod analysis;
pub mod services;
pub mod db;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
