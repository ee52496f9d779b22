//! Adapters for the payment domain ports
//!
//! - [`HttpGatewayClient`]: the hosted payment gateway over HTTP
//! - [`InMemoryIntentStore`]: process-local intent store
//!
//! The PostgreSQL intent store lives in `infra_db`.

pub mod http_gateway;
pub mod memory_store;

pub use http_gateway::HttpGatewayClient;
pub use memory_store::InMemoryIntentStore;
