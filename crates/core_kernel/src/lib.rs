//! Core Kernel - Foundational types for the booking payment bridge
//!
//! This crate provides the building blocks shared by the domain and
//! infrastructure crates:
//! - Money held as integer minor units
//! - Identifiers (surrogate UUID keys and validated booking references)
//! - Port infrastructure for hexagonal adapters

pub mod money;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{IntentId, BookingRef};
pub use error::CoreError;
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
