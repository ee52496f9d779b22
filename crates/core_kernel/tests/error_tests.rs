//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_invalid_state_formats_both_ends() {
    let error = CoreError::invalid_state("Verified", "Created");

    match error {
        CoreError::InvalidStateTransition(msg) => {
            assert!(msg.contains("Verified"));
            assert!(msg.contains("Created"));
        }
        _ => panic!("Expected InvalidStateTransition error"),
    }
}

#[test]
fn test_core_error_from_money_error() {
    let money_error = MoneyError::CurrencyMismatch("USD".to_string(), "EUR".to_string());
    let core_error: CoreError = money_error.into();

    assert!(matches!(core_error, CoreError::Money(_)));
    assert!(core_error.is_client_error());
}

#[test]
fn test_configuration_is_not_a_client_error() {
    let error = CoreError::configuration("gateway token missing");

    assert!(!error.is_client_error());
    assert!(error.to_string().contains("Configuration error"));
}
