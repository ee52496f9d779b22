//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the booking payment bridge using SQLx:
//!
//! - connection pool creation and embedded migrations
//! - the durable payment intent store, with per-booking advisory locks and a
//!   partial unique index guaranteeing one live intent per booking
//! - the user directory read by the push notification service
//!
//! Queries are built at runtime (`sqlx::query`/`query_as`), so building the
//! crate does not need a live database.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresIntentStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/bookings")).await?;
//! let store = PostgresIntentStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::{PostgresIntentStore, PostgresUserDirectory};
