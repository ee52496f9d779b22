//! Property-Based Test Generators
//!
//! Proptest strategies that only produce values satisfying domain invariants.

use core_kernel::{BookingRef, Currency, Money};
use domain_payment::{IntentState, PaymentIntent};
use proptest::prelude::*;

use crate::builders::PaymentIntentBuilder;

/// Strategy for supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::AED),
        Just(Currency::SAR),
        Just(Currency::KWD),
        Just(Currency::BHD),
        Just(Currency::SYP),
    ]
}

/// Strategy for positive amounts in minor units
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000i64
}

/// Strategy for positive Money values
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

/// Strategy for valid booking references
pub fn booking_ref_strategy() -> impl Strategy<Value = BookingRef> {
    "[A-Za-z0-9][A-Za-z0-9-]{0,31}".prop_filter_map("valid booking ref", |s| BookingRef::parse(s).ok())
}

/// Strategy for any intent state
pub fn intent_state_strategy() -> impl Strategy<Value = IntentState> {
    proptest::sample::select(IntentState::ALL.to_vec())
}

/// Strategy for gateway result codes, biased toward `success`
pub fn result_code_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => Just("success".to_string()),
        1 => Just("failed".to_string()),
        1 => Just("declined".to_string()),
        1 => "[a-z_]{1,12}",
    ]
}

/// Strategy for intents in arbitrary states
pub fn payment_intent_strategy() -> impl Strategy<Value = PaymentIntent> {
    (
        booking_ref_strategy(),
        positive_money_strategy(),
        intent_state_strategy(),
        0u32..6,
    )
        .prop_map(|(booking_ref, amount, state, attempts)| {
            PaymentIntentBuilder::new()
                .booking(booking_ref)
                .amount(amount)
                .state(state)
                .attempts(attempts)
                .build()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_generated_money_is_positive(money in positive_money_strategy()) {
            prop_assert!(money.is_positive());
        }

        #[test]
        fn test_generated_booking_refs_are_trimmed(booking_ref in booking_ref_strategy()) {
            prop_assert_eq!(booking_ref.as_str().trim(), booking_ref.as_str());
        }

        #[test]
        fn test_resolved_intents_carry_verification(intent in payment_intent_strategy()) {
            if intent.state.is_resolved() {
                prop_assert!(intent.verification.is_some());
            }
        }
    }
}
