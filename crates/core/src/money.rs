//! Monetary amount value object.
//!
//! Amounts are stored in minor units (cents) as `i64`; the decimal input is
//! rounded half-to-even at construction so arithmetic stays exact afterwards.

use core::cmp::Ordering;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Tolerance when deciding whether a scaled amount sits exactly on a half.
/// `10.005 * 100` is `1000.4999...` in binary floating point; without the
/// tolerance the tie-breaking rule would never fire.
const HALF_EPSILON: f64 = 1e-9;

/// A non-negative amount in a single currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor: i64,
    currency: String,
}

impl Money {
    /// Construct from a decimal amount and a 3-letter currency code.
    ///
    /// The amount is rounded half-to-even to 2 decimals; the currency is
    /// upper-cased. This is the only fallible entry point; a `Money` that
    /// exists is valid.
    pub fn new(amount: f64, currency: &str) -> DomainResult<Self> {
        if !amount.is_finite() {
            return Err(DomainError::invalid_argument("amount must be finite"));
        }
        if amount < 0.0 {
            return Err(DomainError::invalid_argument("amount cannot be negative"));
        }
        let currency = normalize_currency(currency)?;
        let scaled = amount * 100.0;
        if scaled > i64::MAX as f64 {
            return Err(DomainError::invalid_argument("amount out of range"));
        }
        Ok(Self {
            minor: round_half_even(scaled),
            currency,
        })
    }

    /// Zero in the given currency.
    pub fn zero(currency: &str) -> DomainResult<Self> {
        Ok(Self {
            minor: 0,
            currency: normalize_currency(currency)?,
        })
    }

    /// Rebuild from already-validated minor units (store hydration path).
    pub fn from_minor(minor: i64, currency: &str) -> DomainResult<Self> {
        if minor < 0 {
            return Err(DomainError::invalid_argument("amount cannot be negative"));
        }
        Ok(Self {
            minor,
            currency: normalize_currency(currency)?,
        })
    }

    /// Amount in minor units (cents).
    pub fn minor_units(&self) -> i64 {
        self.minor
    }

    /// Amount as a decimal.
    pub fn amount(&self) -> f64 {
        self.minor as f64 / 100.0
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    pub fn add(&self, other: &Money) -> DomainResult<Money> {
        self.require_same_currency(other, "add")?;
        Ok(Self {
            minor: self.minor + other.minor,
            currency: self.currency.clone(),
        })
    }

    pub fn subtract(&self, other: &Money) -> DomainResult<Money> {
        self.require_same_currency(other, "subtract")?;
        let minor = self.minor - other.minor;
        if minor < 0 {
            return Err(DomainError::invalid_operation(
                "subtraction would produce a negative amount",
            ));
        }
        Ok(Self {
            minor,
            currency: self.currency.clone(),
        })
    }

    pub fn multiply(&self, factor: f64) -> DomainResult<Money> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(DomainError::invalid_argument(
                "multiplier must be a non-negative number",
            ));
        }
        Ok(Self {
            minor: round_half_even(self.minor as f64 * factor),
            currency: self.currency.clone(),
        })
    }

    pub fn divide(&self, divisor: f64) -> DomainResult<Money> {
        if !divisor.is_finite() || divisor <= 0.0 {
            return Err(DomainError::invalid_argument("divisor must be positive"));
        }
        Ok(Self {
            minor: round_half_even(self.minor as f64 / divisor),
            currency: self.currency.clone(),
        })
    }

    pub fn is_greater_than(&self, other: &Money) -> DomainResult<bool> {
        Ok(self.try_cmp(other)? == Ordering::Greater)
    }

    /// Total ordering within one currency; mixed currencies are not comparable.
    pub fn try_cmp(&self, other: &Money) -> DomainResult<Ordering> {
        self.require_same_currency(other, "compare")?;
        Ok(self.minor.cmp(&other.minor))
    }

    fn require_same_currency(&self, other: &Money, op: &str) -> DomainResult<()> {
        if self.currency != other.currency {
            return Err(DomainError::invalid_operation(format!(
                "cannot {op} amounts in {} and {}",
                self.currency, other.currency
            )));
        }
        Ok(())
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2} {}", self.amount(), self.currency)
    }
}

fn normalize_currency(currency: &str) -> DomainResult<String> {
    let trimmed = currency.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::invalid_argument(
            "currency must be a 3-letter code",
        ));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Round a scaled (x100) amount to integer minor units, ties to even.
fn round_half_even(scaled: f64) -> i64 {
    let floor = scaled.floor();
    let frac = scaled - floor;
    if (frac - 0.5).abs() < HALF_EPSILON {
        let lower = floor as i64;
        if lower % 2 == 0 { lower } else { lower + 1 }
    } else {
        scaled.round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_to_even_and_uppercases_currency() {
        let m = Money::new(10.005, "usd").unwrap();
        assert_eq!(m.minor_units(), 1000);
        assert_eq!(m.currency(), "USD");

        let m = Money::new(10.015, "usd").unwrap();
        assert_eq!(m.minor_units(), 1002);

        let m = Money::new(2.675, "eur").unwrap();
        assert_eq!(m.minor_units(), 268);
    }

    #[test]
    fn plain_rounding_away_from_half() {
        assert_eq!(Money::new(10.004, "USD").unwrap().minor_units(), 1000);
        assert_eq!(Money::new(10.006, "USD").unwrap().minor_units(), 1001);
    }

    #[test]
    fn rejects_negative_and_non_finite_amounts() {
        assert!(matches!(
            Money::new(-0.01, "USD"),
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            Money::new(f64::NAN, "USD"),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_malformed_currency() {
        for bad in ["", "US", "USDD", "U5D", "  "] {
            assert!(matches!(
                Money::new(1.0, bad),
                Err(DomainError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn adds_and_subtracts_same_currency() {
        let a = Money::new(10.50, "USD").unwrap();
        let b = Money::new(2.25, "USD").unwrap();
        assert_eq!(a.add(&b).unwrap().minor_units(), 1275);
        assert_eq!(a.subtract(&b).unwrap().minor_units(), 825);
    }

    #[test]
    fn subtract_below_zero_is_rejected() {
        let a = Money::new(1.00, "USD").unwrap();
        let b = Money::new(2.00, "USD").unwrap();
        assert!(matches!(
            a.subtract(&b),
            Err(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn mixed_currency_arithmetic_and_comparison_fail() {
        let usd = Money::new(1.00, "USD").unwrap();
        let eur = Money::new(1.00, "EUR").unwrap();
        assert!(matches!(
            usd.add(&eur),
            Err(DomainError::InvalidOperation(_))
        ));
        assert!(matches!(
            usd.try_cmp(&eur),
            Err(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn multiply_and_divide_round_half_even() {
        let m = Money::new(10.00, "USD").unwrap();
        assert_eq!(m.multiply(0.5).unwrap().minor_units(), 500);
        assert_eq!(m.divide(3.0).unwrap().minor_units(), 333);
        // 10.05 * 0.5 = 5.025 -> 502.5 minor, ties to even -> 502
        let m = Money::new(10.05, "USD").unwrap();
        assert_eq!(m.multiply(0.5).unwrap().minor_units(), 502);
    }

    #[test]
    fn rejects_bad_scalars() {
        let m = Money::new(10.00, "USD").unwrap();
        assert!(matches!(
            m.multiply(-1.0),
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            m.divide(0.0),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_and_ordering() {
        let z = Money::zero("usd").unwrap();
        assert!(z.is_zero());
        assert_eq!(z.currency(), "USD");
        let m = Money::new(0.01, "USD").unwrap();
        assert!(m.is_greater_than(&z).unwrap());
        assert!(!z.is_greater_than(&m).unwrap());
    }

    #[test]
    fn displays_with_two_decimals() {
        let m = Money::new(10.5, "usd").unwrap();
        assert_eq!(m.to_string(), "10.50 USD");
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: construction never yields negative minor units and
            /// always upper-cases the currency.
            #[test]
            fn construction_invariants(
                amount in 0.0f64..1_000_000.0,
                currency in "[a-zA-Z]{3}"
            ) {
                let m = Money::new(amount, &currency).unwrap();
                prop_assert!(m.minor_units() >= 0);
                prop_assert_eq!(m.currency(), currency.to_ascii_uppercase());
            }

            /// Property: addition is commutative within one currency.
            #[test]
            fn add_is_commutative(
                a in 0.0f64..100_000.0,
                b in 0.0f64..100_000.0
            ) {
                let x = Money::new(a, "USD").unwrap();
                let y = Money::new(b, "USD").unwrap();
                prop_assert_eq!(x.add(&y).unwrap(), y.add(&x).unwrap());
            }

            /// Property: subtracting what was added restores the amount.
            #[test]
            fn add_then_subtract_round_trips(
                a in 0.0f64..100_000.0,
                b in 0.0f64..100_000.0
            ) {
                let x = Money::new(a, "USD").unwrap();
                let y = Money::new(b, "USD").unwrap();
                prop_assert_eq!(x.add(&y).unwrap().subtract(&y).unwrap(), x);
            }

            /// Property: rounding lands within half a minor unit of the input.
            #[test]
            fn rounding_is_within_half_a_cent(amount in 0.0f64..1_000_000.0) {
                let m = Money::new(amount, "USD").unwrap();
                let delta = (m.minor_units() as f64 - amount * 100.0).abs();
                prop_assert!(delta <= 0.5 + 1e-6);
            }
        }
    }
}
