//! Push Notification Domain
//!
//! Lets staff notify hosts and guests on their mobile devices (new bookings,
//! messages, cancellations, payment confirmations). A send request names the
//! recipient user; the [`UserDirectory`] supplies the device token and the
//! user's opt-in, and the [`PushSender`] delivers the message.

pub mod message;
pub mod error;
pub mod ports;
pub mod adapters;
pub mod service;

pub use message::{PushMessage, SendNotification, ANDROID_CHANNEL_ID};
pub use error::NotificationError;
pub use ports::{PushSender, RecipientProfile, UserDirectory};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::RecordingPushSender;
pub use adapters::{HttpPushSender, InMemoryUserDirectory, PushCredentials};
pub use service::{NotificationService, SendOutcome};
