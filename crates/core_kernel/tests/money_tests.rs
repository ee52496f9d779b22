//! Unit tests for the Money module
//!
//! Covers major/minor conversion, precision rules per currency, and the
//! string form sent to the payment gateway.

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_from_minor_keeps_units() {
        let m = Money::from_minor(10050, Currency::USD);
        assert_eq!(m.minor_units(), 10050);
        assert_eq!(m.currency(), Currency::USD);
    }

    #[test]
    fn test_from_major_whole_amount() {
        let m = Money::from_major(dec!(100), Currency::USD).unwrap();
        assert_eq!(m.minor_units(), 10000);
    }

    #[test]
    fn test_from_major_three_decimal_currency() {
        let m = Money::from_major(dec!(12.345), Currency::BHD).unwrap();
        assert_eq!(m.minor_units(), 12345);
    }

    #[test]
    fn test_from_major_rejects_extra_precision() {
        let err = Money::from_major(dec!(0.001), Currency::EUR).unwrap_err();
        assert!(matches!(err, MoneyError::InvalidAmount(_)));
    }

    #[test]
    fn test_from_major_overflow() {
        let err = Money::from_major(Decimal::MAX, Currency::USD).unwrap_err();
        assert_eq!(err, MoneyError::Overflow);
    }

    #[test]
    fn test_zero() {
        let m = Money::zero(Currency::SAR);
        assert!(m.is_zero());
        assert!(!m.is_positive());
    }
}

mod predicates {
    use super::*;

    #[test]
    fn test_negative_is_not_positive() {
        let m = Money::from_major(dec!(-5), Currency::USD).unwrap();
        assert!(!m.is_positive());
        assert!(!m.is_zero());
    }
}

mod formatting {
    use super::*;

    #[test]
    fn test_display_includes_symbol() {
        let m = Money::from_minor(1999, Currency::USD);
        assert_eq!(m.to_string(), "$ 19.99");
    }

    #[test]
    fn test_display_falls_back_to_code() {
        let m = Money::from_minor(1500, Currency::AED);
        assert_eq!(m.to_string(), "AED 15.00");
    }

    #[test]
    fn test_major_string_drops_trailing_zeros() {
        assert_eq!(Money::from_minor(10000, Currency::USD).to_major_string(), "100");
        assert_eq!(Money::from_minor(10050, Currency::USD).to_major_string(), "100.5");
        assert_eq!(Money::from_minor(1, Currency::KWD).to_major_string(), "0.001");
    }
}

mod currency {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!(" Jod ".parse::<Currency>().unwrap(), Currency::JOD);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "XYZ".parse::<Currency>().unwrap_err();
        assert_eq!(err, MoneyError::UnknownCurrency("XYZ".to_string()));
    }

    #[test]
    fn test_serde_uppercase() {
        let json = serde_json::to_string(&Currency::TRY).unwrap();
        assert_eq!(json, "\"TRY\"");
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_add_same_currency() {
        let a = Money::from_minor(250, Currency::USD);
        let b = Money::from_minor(750, Currency::USD);
        assert_eq!(a.checked_add(&b).unwrap().minor_units(), 1000);
    }

    #[test]
    fn test_checked_add_overflow() {
        let a = Money::from_minor(i64::MAX, Currency::USD);
        let b = Money::from_minor(1, Currency::USD);
        assert_eq!(a.checked_add(&b).unwrap_err(), MoneyError::Overflow);
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;
    use test_utils::{currency_strategy, positive_amount_minor_strategy, positive_money_strategy};

    proptest! {
        #[test]
        fn major_string_round_trips(money in positive_money_strategy()) {
            let major = Decimal::from_str(&money.to_major_string()).unwrap();
            let restored = Money::from_major(major, money.currency()).unwrap();
            prop_assert_eq!(restored, money);
        }

        #[test]
        fn major_string_never_exceeds_currency_precision(money in positive_money_strategy()) {
            let rendered = money.to_major_string();
            let fraction = rendered.split('.').nth(1).map_or(0, str::len);
            prop_assert!(fraction as u32 <= money.currency().decimal_places());
        }

        #[test]
        fn addition_of_positive_amounts_stays_positive(
            currency in currency_strategy(),
            a in positive_amount_minor_strategy(),
            b in positive_amount_minor_strategy(),
        ) {
            let sum = Money::from_minor(a, currency)
                .checked_add(&Money::from_minor(b, currency))
                .unwrap();
            prop_assert!(sum.is_positive());
            prop_assert_eq!(sum.minor_units(), a + b);
        }
    }
}
