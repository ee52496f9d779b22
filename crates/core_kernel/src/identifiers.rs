//! Strongly-typed identifiers for domain entities
//!
//! Surrogate keys are newtype wrappers around UUIDs. Business keys supplied by
//! callers (booking references) are validated opaque strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Payment domain identifiers
define_id!(IntentId, "PI");

/// Maximum accepted length of a booking reference
pub const BOOKING_REF_MAX_LEN: usize = 128;

/// Caller-supplied reference correlating a payment attempt to a reservation
///
/// The value is opaque to the bridge; it is forwarded to the gateway as
/// `custom_ref`, so it must be non-blank, reasonably short, and free of
/// control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookingRef(String);

impl BookingRef {
    /// Validates and wraps a booking reference
    pub fn parse(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(CoreError::validation("booking reference must not be empty"));
        }
        if value.len() > BOOKING_REF_MAX_LEN {
            return Err(CoreError::validation(format!(
                "booking reference exceeds {} characters",
                BOOKING_REF_MAX_LEN
            )));
        }
        if value.chars().any(char::is_control) {
            return Err(CoreError::validation(
                "booking reference contains control characters",
            ));
        }
        Ok(Self(value))
    }

    /// Returns the reference as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BookingRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BookingRef {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<BookingRef> for String {
    fn from(value: BookingRef) -> String {
        value.0
    }
}

impl AsRef<str> for BookingRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
