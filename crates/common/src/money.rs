//! Monetary amounts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Money amount represented in cents to avoid floating point drift.
///
/// On the wire an amount is a plain decimal number (`3045.5`), which is what
/// both services and their clients exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Converts a decimal amount, rounding to the nearest cent.
    pub fn from_decimal(amount: f64) -> Self {
        Self {
            cents: (amount * 100.0).round() as i64,
        }
    }

    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    pub const fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount as a decimal number.
    pub fn as_decimal(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    pub const fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, saturating at the representable bounds.
    pub const fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(quantity as i64),
        }
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub const fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        match self.cents.checked_mul(quantity as i64) {
            Some(cents) => Some(Money { cents }),
            None => None,
        }
    }

    pub const fn checked_add(&self, rhs: Money) -> Option<Money> {
        match self.cents.checked_add(rhs.cents) {
            Some(cents) => Some(Money { cents }),
            None => None,
        }
    }

    /// Sums `amounts`, or `None` if the total overflows.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_sub(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents = self.cents.saturating_add(rhs.cents);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        if !amount.is_finite() {
            return Err(serde::de::Error::custom("amount must be a finite number"));
        }
        Ok(Money::from_decimal(amount))
    }
}
