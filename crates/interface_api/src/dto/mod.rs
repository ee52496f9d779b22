//! Request and response bodies
//!
//! Field names are camelCase to match the admin frontend.

pub mod payment;
pub mod notification;
