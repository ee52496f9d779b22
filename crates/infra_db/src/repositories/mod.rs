//! Row-level SQL for each table
//!
//! Repositories map between database rows and domain types; the adapters in
//! [`crate::adapters`] compose them into port implementations.

pub mod payment_intents;
pub mod users;

pub use payment_intents::IntentRow;
pub use users::UserPushRow;
