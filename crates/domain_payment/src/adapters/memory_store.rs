//! In-memory intent store
//!
//! Used by tests and by the server when no `DATABASE_URL` is configured.
//! Live intents sit in a map keyed by booking reference; an intent replaced
//! after expiry moves to an archive so listings still show it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use core_kernel::{
    BookingRef, DomainPort, HealthCheckResult, HealthCheckable, PortError,
};

use crate::intent::{IntentState, PaymentIntent};
use crate::ports::{BookingLock, IntentFactory, IntentMutation, IntentStore, TransitionError};

/// Lock table size above which idle entries are pruned
const LOCK_TABLE_PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub struct InMemoryIntentStore {
    current: RwLock<HashMap<BookingRef, PaymentIntent>>,
    archive: RwLock<Vec<PaymentIntent>>,
    locks: std::sync::Mutex<HashMap<BookingRef, Arc<Mutex<()>>>>,
}

impl InMemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the store, replacing any intent for the same booking
    pub async fn with_intents(intents: Vec<PaymentIntent>) -> Self {
        let store = Self::new();
        {
            let mut current = store.current.write().await;
            for intent in intents {
                current.insert(intent.booking_ref.clone(), intent);
            }
        }
        store
    }

    /// Expired intents superseded by a newer one for the same booking
    pub async fn archived(&self, booking_ref: &BookingRef) -> Vec<PaymentIntent> {
        self.archive
            .read()
            .await
            .iter()
            .filter(|intent| &intent.booking_ref == booking_ref)
            .cloned()
            .collect()
    }

    fn booking_mutex(&self, booking_ref: &BookingRef) -> Result<Arc<Mutex<()>>, PortError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| PortError::internal("booking lock table poisoned"))?;
        if locks.len() > LOCK_TABLE_PRUNE_THRESHOLD {
            locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        }
        Ok(locks.entry(booking_ref.clone()).or_default().clone())
    }
}

impl DomainPort for InMemoryIntentStore {}

#[async_trait]
impl HealthCheckable for InMemoryIntentStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-intent-store", 0)
    }
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn lock_booking(&self, booking_ref: &BookingRef) -> Result<BookingLock, PortError> {
        let mutex = self.booking_mutex(booking_ref)?;
        let guard = mutex.lock_owned().await;
        Ok(BookingLock::new(guard))
    }

    async fn get(&self, booking_ref: &BookingRef) -> Result<Option<PaymentIntent>, PortError> {
        Ok(self.current.read().await.get(booking_ref).cloned())
    }

    async fn get_or_create(
        &self,
        booking_ref: &BookingRef,
        factory: IntentFactory<'_>,
    ) -> Result<PaymentIntent, PortError> {
        let mut current = self.current.write().await;
        if let Some(existing) = current.get(booking_ref) {
            if existing.state != IntentState::Expired {
                return Ok(existing.clone());
            }
        }

        let intent = factory();
        if let Some(expired) = current.insert(booking_ref.clone(), intent.clone()) {
            self.archive.write().await.push(expired);
        }
        Ok(intent)
    }

    async fn transition(
        &self,
        booking_ref: &BookingRef,
        from: &[IntentState],
        to: IntentState,
        mutate: IntentMutation<'_>,
    ) -> Result<PaymentIntent, TransitionError> {
        let mut current = self.current.write().await;
        let intent = current
            .get_mut(booking_ref)
            .ok_or_else(|| TransitionError::NotFound(booking_ref.clone()))?;

        if !from.contains(&intent.state) || !intent.state.can_transition_to(to) {
            return Err(TransitionError::Stale { current: intent.state });
        }

        let mut updated = intent.clone();
        mutate(&mut updated);
        updated.state = to;
        updated.updated_at = Utc::now();
        *intent = updated.clone();
        Ok(updated)
    }

    async fn flag_for_review(&self, booking_ref: &BookingRef, reason: &str) -> Result<(), PortError> {
        let mut current = self.current.write().await;
        let intent = current
            .get_mut(booking_ref)
            .ok_or_else(|| PortError::not_found("PaymentIntent", booking_ref))?;
        intent.flag_for_review(reason);
        Ok(())
    }

    async fn list_stale(
        &self,
        states: &[IntentState],
        created_before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<PaymentIntent>, PortError> {
        let mut stale: Vec<PaymentIntent> = self
            .current
            .read()
            .await
            .values()
            .filter(|intent| states.contains(&intent.state) && intent.created_at < created_before)
            .cloned()
            .collect();
        stale.sort_by_key(|intent| intent.created_at);
        stale.truncate(limit as usize);
        Ok(stale)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<PaymentIntent>, PortError> {
        let mut intents: Vec<PaymentIntent> = self.current.read().await.values().cloned().collect();
        intents.extend(self.archive.read().await.iter().cloned());
        intents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        intents.truncate(limit as usize);
        Ok(intents)
    }
}
