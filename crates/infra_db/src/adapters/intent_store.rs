//! PostgreSQL Intent Store
//!
//! Implements `IntentStore` on the `payment_intents` table.
//!
//! # Concurrency
//!
//! - **Booking lock**: an in-process mutex per booking, then one pool
//!   connection holding the session lock `pg_advisory_lock(hashtext(booking_ref))`.
//!   The advisory lock excludes other server instances. While the lock is
//!   held, every store call for that booking runs on the lock's connection,
//!   so a holder never waits on the pool for a second one.
//! - **Release**: dropping the lock unlocks on a spawned task and only then
//!   frees the in-process mutex. A connection whose unlock fails is closed
//!   rather than returned to the pool.
//! - **Live-intent uniqueness**: a partial unique index on `booking_ref`
//!   where `state <> 'expired'`; creation uses `ON CONFLICT DO NOTHING`.
//! - **Guarded transitions**: `SELECT ... FOR UPDATE` on the live row, state
//!   check, then `UPDATE` in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{Connection, PgConnection, PgPool, Postgres};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use core_kernel::{BookingRef, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_payment::ports::{IntentFactory, IntentMutation};
use domain_payment::{BookingLock, IntentState, IntentStore, PaymentIntent, TransitionError};

use crate::error::DatabaseError;
use crate::repositories::payment_intents::{self as repo, IntentRow};

type HeldConnection = Arc<Mutex<PoolConnection<Postgres>>>;
type HeldTable = Arc<std::sync::Mutex<HashMap<BookingRef, HeldConnection>>>;

/// PostgreSQL-backed implementation of the `IntentStore` port
#[derive(Clone)]
pub struct PostgresIntentStore {
    pool: PgPool,
    local_locks: Arc<std::sync::Mutex<HashMap<BookingRef, Arc<Mutex<()>>>>>,
    held: HeldTable,
}

impl fmt::Debug for PostgresIntentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresIntentStore")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl PostgresIntentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            local_locks: Arc::default(),
            held: Arc::default(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn local_mutex(&self, booking_ref: &BookingRef) -> Result<Arc<Mutex<()>>, PortError> {
        let mut locks = self
            .local_locks
            .lock()
            .map_err(|_| PortError::internal("booking lock table poisoned"))?;
        locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        Ok(locks.entry(booking_ref.clone()).or_default().clone())
    }

    /// The booking's lock connection if one is held, else a pooled one
    async fn session(&self, booking_ref: &BookingRef) -> Result<Session, PortError> {
        let held = self
            .held
            .lock()
            .map_err(|_| PortError::internal("held connection table poisoned"))?
            .get(booking_ref)
            .cloned();

        match held {
            Some(connection) => Ok(Session::Held(connection.lock_owned().await)),
            None => Ok(Session::Pooled(
                self.pool.acquire().await.map_err(port_error)?,
            )),
        }
    }
}

enum Session {
    Held(OwnedMutexGuard<PoolConnection<Postgres>>),
    Pooled(PoolConnection<Postgres>),
}

impl Deref for Session {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            Session::Held(connection) => &***connection,
            Session::Pooled(connection) => &**connection,
        }
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            Session::Held(connection) => &mut ***connection,
            Session::Pooled(connection) => &mut **connection,
        }
    }
}

/// Advisory lock guard stored inside a [`BookingLock`]
struct AdvisoryLock {
    booking_ref: BookingRef,
    connection: HeldConnection,
    held: HeldTable,
    local: Option<OwnedMutexGuard<()>>,
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        if let Ok(mut held) = self.held.lock() {
            if held
                .get(&self.booking_ref)
                .is_some_and(|current| Arc::ptr_eq(current, &self.connection))
            {
                held.remove(&self.booking_ref);
            }
        }

        let connection = self.connection.clone();
        let booking_ref = self.booking_ref.clone();
        let local = self.local.take();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(release(connection, booking_ref, local));
            }
            Err(_) => {
                // No runtime to unlock on; closing the session releases it
                if let Ok(mut connection) = connection.try_lock() {
                    connection.close_on_drop();
                }
            }
        }
    }
}

async fn release(connection: HeldConnection, booking_ref: BookingRef, local: Option<OwnedMutexGuard<()>>) {
    let mut connection = connection.lock_owned().await;
    let unlocked = sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock(hashtext($1))")
        .bind(booking_ref.as_str())
        .fetch_one(&mut **connection)
        .await;

    match unlocked {
        Ok(true) => debug!(booking_ref = %booking_ref, "Booking lock released"),
        Ok(false) => {
            warn!(booking_ref = %booking_ref, "Booking lock was not held at release");
            connection.close_on_drop();
        }
        Err(e) => {
            warn!(booking_ref = %booking_ref, error = %e, "Booking unlock failed, closing connection");
            connection.close_on_drop();
        }
    }
    drop(local);
}

fn port_error(error: impl Into<DatabaseError>) -> PortError {
    PortError::from(error.into())
}

fn to_domain(rows: Vec<IntentRow>) -> Result<Vec<PaymentIntent>, PortError> {
    rows.into_iter()
        .map(|row| row.into_domain().map_err(PortError::from))
        .collect()
}

impl DomainPort for PostgresIntentStore {}

#[async_trait]
impl HealthCheckable for PostgresIntentStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy("postgres-intent-store", latency_ms),
            Err(e) => HealthCheckResult::unhealthy(
                "postgres-intent-store",
                latency_ms,
                format!("Database error: {}", e),
            ),
        }
    }
}

#[async_trait]
impl IntentStore for PostgresIntentStore {
    async fn lock_booking(&self, booking_ref: &BookingRef) -> Result<BookingLock, PortError> {
        let local = self.local_mutex(booking_ref)?.lock_owned().await;
        let connection: HeldConnection = Arc::new(Mutex::new(
            self.pool.acquire().await.map_err(port_error)?,
        ));

        // Built before locking so a cancelled acquire still unlocks
        let guard = AdvisoryLock {
            booking_ref: booking_ref.clone(),
            connection: connection.clone(),
            held: self.held.clone(),
            local: Some(local),
        };
        {
            let mut session = connection.lock().await;
            sqlx::query("SELECT pg_advisory_lock(hashtext($1))")
                .bind(booking_ref.as_str())
                .execute(&mut **session)
                .await
                .map_err(port_error)?;
        }

        self.held
            .lock()
            .map_err(|_| PortError::internal("held connection table poisoned"))?
            .insert(booking_ref.clone(), connection);

        debug!(booking_ref = %booking_ref, "Booking lock acquired");
        Ok(BookingLock::new(guard))
    }

    async fn get(&self, booking_ref: &BookingRef) -> Result<Option<PaymentIntent>, PortError> {
        let mut session = self.session(booking_ref).await?;
        repo::fetch_current(&mut *session, booking_ref)
            .await?
            .map(IntentRow::into_domain)
            .transpose()
            .map_err(PortError::from)
    }

    async fn get_or_create(
        &self,
        booking_ref: &BookingRef,
        factory: IntentFactory<'_>,
    ) -> Result<PaymentIntent, PortError> {
        let mut session = self.session(booking_ref).await?;

        if let Some(row) = repo::fetch_current(&mut *session, booking_ref).await? {
            if row.state != IntentState::Expired.as_str() {
                return Ok(row.into_domain()?);
            }
        }

        let candidate = IntentRow::from_domain(&factory())?;
        if repo::insert_if_no_live(&mut *session, &candidate).await? {
            debug!(booking_ref = %booking_ref, "Payment intent created");
        }

        let live = repo::fetch_current(&mut *session, booking_ref)
            .await?
            .filter(|row| row.state != IntentState::Expired.as_str())
            .ok_or_else(|| PortError::conflict(format!("live intent for {} disappeared", booking_ref)))?;
        Ok(live.into_domain()?)
    }

    async fn transition(
        &self,
        booking_ref: &BookingRef,
        from: &[IntentState],
        to: IntentState,
        mutate: IntentMutation<'_>,
    ) -> Result<PaymentIntent, TransitionError> {
        let mut session = self.session(booking_ref).await?;
        let mut tx = Connection::begin(&mut *session).await.map_err(port_error)?;

        let Some(row) = repo::fetch_live_for_update(&mut *tx, booking_ref)
            .await
            .map_err(PortError::from)?
        else {
            return match repo::fetch_current(&mut *tx, booking_ref)
                .await
                .map_err(PortError::from)?
            {
                Some(row) => Err(TransitionError::Stale {
                    current: repo::parse_state(&row.state).map_err(PortError::from)?,
                }),
                None => Err(TransitionError::NotFound(booking_ref.clone())),
            };
        };

        let mut intent = row.into_domain().map_err(PortError::from)?;
        if !from.contains(&intent.state) || !intent.state.can_transition_to(to) {
            return Err(TransitionError::Stale { current: intent.state });
        }

        mutate(&mut intent);
        intent.state = to;
        intent.updated_at = Utc::now();

        let row = IntentRow::from_domain(&intent).map_err(PortError::from)?;
        repo::update(&mut *tx, &row).await.map_err(PortError::from)?;
        tx.commit().await.map_err(port_error)?;

        Ok(intent)
    }

    async fn flag_for_review(&self, booking_ref: &BookingRef, reason: &str) -> Result<(), PortError> {
        let mut session = self.session(booking_ref).await?;
        if repo::flag_for_review(&mut *session, booking_ref, reason).await? {
            Ok(())
        } else {
            Err(PortError::not_found("PaymentIntent", booking_ref))
        }
    }

    async fn list_stale(
        &self,
        states: &[IntentState],
        created_before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<PaymentIntent>, PortError> {
        to_domain(repo::list_stale(&self.pool, states, created_before, limit).await?)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<PaymentIntent>, PortError> {
        to_domain(repo::list_recent(&self.pool, limit).await?)
    }
}
