//! PostgreSQL adapters for the domain ports
//!
//! - [`PostgresIntentStore`]: `domain_payment::IntentStore`
//! - [`PostgresUserDirectory`]: `domain_notification::UserDirectory`
//!
//! ```rust,ignore
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! let store: Arc<dyn IntentStore> = Arc::new(PostgresIntentStore::new(pool.clone()));
//! let users: Arc<dyn UserDirectory> = Arc::new(PostgresUserDirectory::new(pool));
//! ```

pub mod intent_store;
pub mod user_directory;

pub use intent_store::PostgresIntentStore;
pub use user_directory::PostgresUserDirectory;
