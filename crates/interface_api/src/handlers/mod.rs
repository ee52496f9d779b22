//! Request handlers

pub mod health;
pub mod payment;
pub mod intents;
pub mod notification;
