//! Adapters for the notification ports
//!
//! The PostgreSQL user directory lives in `infra_db`.

pub mod http_push;
pub mod memory_directory;

pub use http_push::{HttpPushSender, PushCredentials};
pub use memory_directory::InMemoryUserDirectory;
