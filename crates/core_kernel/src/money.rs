//! Money types held as integer minor units
//!
//! Booking amounts arrive as decimal major units ("100", "12.50") but are kept
//! as an `i64` count of minor units so that stored intents never drift through
//! floating-point rounding. Conversion back to the gateway's major-unit wire
//! form goes through rust_decimal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    AED,
    SAR,
    QAR,
    KWD,
    BHD,
    JOD,
    TRY,
    SYP,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::KWD | Currency::BHD | Currency::JOD => 3,
            _ => 2,
        }
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::TRY => "₺",
            other => other.code(),
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AED => "AED",
            Currency::SAR => "SAR",
            Currency::QAR => "QAR",
            Currency::KWD => "KWD",
            Currency::BHD => "BHD",
            Currency::JOD => "JOD",
            Currency::TRY => "TRY",
            Currency::SYP => "SYP",
        }
    }

    fn minor_factor(&self) -> i64 {
        10_i64.pow(self.decimal_places())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "AED" => Ok(Currency::AED),
            "SAR" => Ok(Currency::SAR),
            "QAR" => Ok(Currency::QAR),
            "KWD" => Ok(Currency::KWD),
            "BHD" => Ok(Currency::BHD),
            "JOD" => Ok(Currency::JOD),
            "TRY" => Ok(Currency::TRY),
            "SYP" => Ok(Currency::SYP),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount with associated currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates Money from an integer amount in minor units (e.g., cents)
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        Self {
            amount_minor: minor_units,
            currency,
        }
    }

    /// Creates Money from a major-unit decimal such as `12.50`
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidAmount` if the value carries more fractional
    /// digits than the currency allows, and `MoneyError::Overflow` if it does
    /// not fit in an `i64` of minor units.
    pub fn from_major(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        let dp = currency.decimal_places();
        let normalized = amount.normalize();
        if normalized.scale() > dp {
            return Err(MoneyError::InvalidAmount(format!(
                "{} has more than {} decimal places for {}",
                amount, dp, currency
            )));
        }

        let minor = normalized
            .checked_mul(Decimal::from(currency.minor_factor()))
            .ok_or(MoneyError::Overflow)?;
        let minor = i64::try_from(minor).map_err(|_| MoneyError::Overflow)?;

        Ok(Self::from_minor(minor, currency))
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    /// Returns the amount in minor units
    pub fn minor_units(&self) -> i64 {
        self.amount_minor
    }

    /// Returns the amount in major units
    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.amount_minor, self.currency.decimal_places())
    }

    /// Renders the major-unit amount without trailing zeros (`100`, `12.5`)
    pub fn to_major_string(&self) -> String {
        self.to_major().normalize().to_string()
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    /// Returns true if the amount is positive
    pub fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    /// Checked addition that returns an error on currency mismatch or overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        let sum = self
            .amount_minor
            .checked_add(other.amount_minor)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::from_minor(sum, self.currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency.symbol(), self.to_major())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn major_minor_conversion_is_lossless(amount in -1_000_000_000i64..1_000_000_000i64) {
            let money = Money::from_minor(amount, Currency::USD);
            let back = Money::from_major(money.to_major(), Currency::USD).unwrap();
            prop_assert_eq!(back, money);
        }

        #[test]
        fn major_string_parses_back(amount in 1i64..1_000_000_000i64) {
            let money = Money::from_minor(amount, Currency::JOD);
            let parsed: Decimal = money.to_major_string().parse().unwrap();
            prop_assert_eq!(Money::from_major(parsed, Currency::JOD).unwrap(), money);
        }
    }
}
