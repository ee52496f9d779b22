//! Core error types used across the system

use thiserror::Error;
use crate::money::MoneyError;

/// Core error type for the kernel
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn invalid_state(from: impl std::fmt::Debug, to: impl std::fmt::Debug) -> Self {
        CoreError::InvalidStateTransition(format!("{:?} -> {:?}", from, to))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        CoreError::Configuration(message.into())
    }

    /// True for errors caused by caller input rather than deployment or logic faults
    pub fn is_client_error(&self) -> bool {
        matches!(self, CoreError::Money(_) | CoreError::Validation(_))
    }
}
