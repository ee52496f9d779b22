//! Test Utilities Crate
//!
//! Shared test infrastructure for the booking payment bridge suites.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common values
//! - `builders`: Builder patterns for payment intents
//! - `harness`: In-memory orchestrator and notification wiring with scripted collaborators
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators
//! - `database`: Disposable PostgreSQL containers for store adapter tests

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod assertions;
pub mod generators;
pub mod database;

pub use fixtures::*;
pub use builders::*;
pub use harness::*;
pub use assertions::*;
pub use generators::*;
