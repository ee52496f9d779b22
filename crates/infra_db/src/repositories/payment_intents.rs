//! Payment intent repository
//!
//! Row-level SQL for the `payment_intents` table. Functions take any
//! PostgreSQL executor so they can run on the pool or inside a transaction.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{BookingRef, Currency, Money};
use domain_payment::{IntentState, PaymentIntent, VerificationRecord};

use crate::error::DatabaseError;

const INTENT_COLUMNS: &str = r#"
    intent_id, booking_ref, amount_minor, currency, payer_email, payer_phone,
    state, gateway_ref, redirect_url, attempts, last_error, verification,
    needs_review, review_reason, created_at, updated_at
"#;

/// Database row for a payment intent
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IntentRow {
    pub intent_id: Uuid,
    pub booking_ref: String,
    pub amount_minor: i64,
    pub currency: String,
    pub payer_email: String,
    pub payer_phone: Option<String>,
    pub state: String,
    pub gateway_ref: Option<String>,
    pub redirect_url: Option<String>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub verification: Option<serde_json::Value>,
    pub needs_review: bool,
    pub review_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntentRow {
    pub fn from_domain(intent: &PaymentIntent) -> Result<Self, DatabaseError> {
        let verification = intent
            .verification
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(DatabaseError::serialization)?;

        Ok(Self {
            intent_id: (*intent.id.as_uuid()),
            booking_ref: intent.booking_ref.to_string(),
            amount_minor: intent.amount.minor_units(),
            currency: intent.amount.currency().code().to_string(),
            payer_email: intent.payer_email.clone(),
            payer_phone: intent.payer_phone.clone(),
            state: intent.state.as_str().to_string(),
            gateway_ref: intent.gateway_ref.clone(),
            redirect_url: intent.redirect_url.clone(),
            attempts: i32::try_from(intent.attempts).map_err(DatabaseError::serialization)?,
            last_error: intent.last_error.clone(),
            verification,
            needs_review: intent.needs_review,
            review_reason: intent.review_reason.clone(),
            created_at: intent.created_at,
            updated_at: intent.updated_at,
        })
    }

    pub fn into_domain(self) -> Result<PaymentIntent, DatabaseError> {
        let currency = Currency::from_str(&self.currency).map_err(DatabaseError::serialization)?;
        let verification = self
            .verification
            .map(serde_json::from_value::<VerificationRecord>)
            .transpose()
            .map_err(DatabaseError::serialization)?;

        Ok(PaymentIntent {
            id: self.intent_id.into(),
            booking_ref: BookingRef::parse(self.booking_ref).map_err(DatabaseError::serialization)?,
            amount: Money::from_minor(self.amount_minor, currency),
            payer_email: self.payer_email,
            payer_phone: self.payer_phone,
            state: parse_state(&self.state)?,
            gateway_ref: self.gateway_ref,
            redirect_url: self.redirect_url,
            attempts: u32::try_from(self.attempts).map_err(DatabaseError::serialization)?,
            last_error: self.last_error,
            verification,
            needs_review: self.needs_review,
            review_reason: self.review_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub fn parse_state(value: &str) -> Result<IntentState, DatabaseError> {
    IntentState::from_str(value).map_err(DatabaseError::serialization)
}

/// Current intent for a booking: the live one, else the latest expired one
pub async fn fetch_current<'e>(
    executor: impl PgExecutor<'e>,
    booking_ref: &BookingRef,
) -> Result<Option<IntentRow>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM payment_intents WHERE booking_ref = $1 \
         ORDER BY (state <> 'expired') DESC, created_at DESC LIMIT 1",
        INTENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, IntentRow>(&sql)
        .bind(booking_ref.as_str())
        .fetch_optional(executor)
        .await?)
}

/// The live intent for a booking, row-locked until the transaction ends
pub async fn fetch_live_for_update<'e>(
    executor: impl PgExecutor<'e>,
    booking_ref: &BookingRef,
) -> Result<Option<IntentRow>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM payment_intents WHERE booking_ref = $1 AND state <> 'expired' FOR UPDATE",
        INTENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, IntentRow>(&sql)
        .bind(booking_ref.as_str())
        .fetch_optional(executor)
        .await?)
}

/// Inserts the row unless the booking already has a live intent
pub async fn insert_if_no_live<'e>(
    executor: impl PgExecutor<'e>,
    row: &IntentRow,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO payment_intents (
            intent_id, booking_ref, amount_minor, currency, payer_email, payer_phone,
            state, gateway_ref, redirect_url, attempts, last_error, verification,
            needs_review, review_reason, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ON CONFLICT (booking_ref) WHERE state <> 'expired' DO NOTHING
        "#,
    )
    .bind(row.intent_id)
    .bind(&row.booking_ref)
    .bind(row.amount_minor)
    .bind(&row.currency)
    .bind(&row.payer_email)
    .bind(&row.payer_phone)
    .bind(&row.state)
    .bind(&row.gateway_ref)
    .bind(&row.redirect_url)
    .bind(row.attempts)
    .bind(&row.last_error)
    .bind(&row.verification)
    .bind(row.needs_review)
    .bind(&row.review_reason)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Writes every mutable column of an existing intent
pub async fn update<'e>(executor: impl PgExecutor<'e>, row: &IntentRow) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE payment_intents SET
            state = $2,
            gateway_ref = $3,
            redirect_url = $4,
            attempts = $5,
            last_error = $6,
            verification = $7,
            needs_review = $8,
            review_reason = $9,
            updated_at = $10
        WHERE intent_id = $1
        "#,
    )
    .bind(row.intent_id)
    .bind(&row.state)
    .bind(&row.gateway_ref)
    .bind(&row.redirect_url)
    .bind(row.attempts)
    .bind(&row.last_error)
    .bind(&row.verification)
    .bind(row.needs_review)
    .bind(&row.review_reason)
    .bind(row.updated_at)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("PaymentIntent", row.intent_id));
    }
    Ok(())
}

/// Flags the booking's current intent; returns false if there is none
pub async fn flag_for_review<'e>(
    executor: impl PgExecutor<'e>,
    booking_ref: &BookingRef,
    reason: &str,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE payment_intents
        SET needs_review = TRUE, review_reason = $2, updated_at = now()
        WHERE intent_id = (
            SELECT intent_id FROM payment_intents
            WHERE booking_ref = $1
            ORDER BY (state <> 'expired') DESC, created_at DESC
            LIMIT 1
        )
        "#,
    )
    .bind(booking_ref.as_str())
    .bind(reason)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Intents in `states` created before `created_before`, oldest first
pub async fn list_stale<'e>(
    executor: impl PgExecutor<'e>,
    states: &[IntentState],
    created_before: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<IntentRow>, DatabaseError> {
    let states: Vec<String> = states.iter().map(|s| s.as_str().to_string()).collect();
    let sql = format!(
        "SELECT {} FROM payment_intents WHERE state = ANY($1) AND created_at < $2 \
         ORDER BY created_at ASC LIMIT $3",
        INTENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, IntentRow>(&sql)
        .bind(states)
        .bind(created_before)
        .bind(i64::from(limit))
        .fetch_all(executor)
        .await?)
}

/// Most recently created intents, newest first
pub async fn list_recent<'e>(
    executor: impl PgExecutor<'e>,
    limit: u32,
) -> Result<Vec<IntentRow>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM payment_intents ORDER BY created_at DESC LIMIT $1",
        INTENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, IntentRow>(&sql)
        .bind(i64::from(limit))
        .fetch_all(executor)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_payment::VerificationSource;

    #[test]
    fn test_row_round_trip_preserves_intent() {
        let mut intent = PaymentIntent::new(
            BookingRef::parse("B-1042").unwrap(),
            Money::from_minor(123_456, Currency::KWD),
            "guest@example.com",
            Some("+96550000000".to_string()),
        );
        intent.state = IntentState::Verified;
        intent.attempts = 2;
        intent.verification = Some(VerificationRecord::new(
            "success",
            VerificationSource::Callback,
            serde_json::json!({ "result": "success" }),
        ));

        let restored = IntentRow::from_domain(&intent).unwrap().into_domain().unwrap();

        assert_eq!(restored, intent);
    }

    #[test]
    fn test_unknown_state_is_serialization_error() {
        let err = parse_state("settled").unwrap_err();
        assert!(matches!(err, DatabaseError::SerializationError(_)));
    }
}
