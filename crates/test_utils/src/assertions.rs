//! Custom Test Assertions
//!
//! Assertion helpers with failure messages that name the booking and state
//! involved.

use core_kernel::Money;
use domain_payment::{IntentState, PaymentError, PaymentIntent};
use serde_json::Value;

/// Asserts that an intent is in `expected`
pub fn assert_state(intent: &PaymentIntent, expected: IntentState) {
    assert_eq!(
        intent.state, expected,
        "Booking {} expected in state {}, found {} (attempts={}, last_error={:?})",
        intent.booking_ref, expected, intent.state, intent.attempts, intent.last_error
    );
}

/// Asserts that an intent has a recorded gateway outcome with `result_code`
pub fn assert_resolved_with(intent: &PaymentIntent, result_code: &str) {
    assert!(
        intent.state.is_resolved(),
        "Booking {} expected resolved, found {}",
        intent.booking_ref,
        intent.state
    );
    let record = intent
        .verification
        .as_ref()
        .unwrap_or_else(|| panic!("Booking {} resolved without a verification record", intent.booking_ref));
    assert!(
        record.matches_result(result_code),
        "Booking {} recorded result '{}', expected '{}'",
        intent.booking_ref,
        record.result_code,
        result_code
    );
}

/// Asserts that two Money values are identical
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.minor_units(),
        expected.minor_units(),
        "Amount mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts that a result failed with a payment error of `kind`
pub fn assert_payment_error<T: std::fmt::Debug>(result: &Result<T, PaymentError>, kind: &str) {
    match result {
        Err(err) => assert_eq!(err.kind(), kind, "Unexpected payment error: {}", err),
        Ok(value) => panic!("Expected payment error '{}', got Ok({:?})", kind, value),
    }
}

/// Asserts that an API error body carries `kind` and a message
pub fn assert_error_body(body: &Value, kind: &str) {
    assert_eq!(body["error"], kind, "Unexpected error body: {}", body);
    assert!(
        body["message"].as_str().is_some_and(|m| !m.is_empty()),
        "Error body has no message: {}",
        body
    );
}
