use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Signed money amount represented as **integer cents**.
///
/// The remote API speaks decimal numbers (`"amount": 12.5`); the value is
/// converted to cents at the (de)serialization boundary so that every sum and
/// average computed on the client is exact.
///
/// # Examples
///
/// ```rust
/// use api_types::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// assert_eq!(Money::from_major(-25.5).cents(), -2550);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyParseError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount")]
    Invalid,
    #[error("too many decimals")]
    TooManyDecimals,
    #[error("amount too large")]
    Overflow,
}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Converts a decimal amount of major units, rounding to the nearest cent.
    #[must_use]
    pub fn from_major(value: f64) -> Self {
        Self((value * 100.0).round() as i64)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Divides by `divisor`, rounding half away from zero.
    ///
    /// Dividing by zero yields [`Money::ZERO`].
    #[must_use]
    pub fn div_round(self, divisor: u64) -> Money {
        let Ok(divisor) = i64::try_from(divisor) else {
            return Money::ZERO;
        };
        if divisor == 0 {
            return Money::ZERO;
        }
        let quotient = self.0 / divisor;
        let remainder = self.0 % divisor;
        if remainder.unsigned_abs() * 2 >= divisor.unsigned_abs() {
            Money(quotient + self.0.signum())
        } else {
            Money(quotient)
        }
    }

    /// Fraction of `total` this amount represents, `0.0` when `total` is zero.
    #[must_use]
    pub fn share_of(self, total: Money) -> f64 {
        if total.is_zero() {
            return 0.0;
        }
        self.0 as f64 / total.0 as f64
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Money::from_major)
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    /// Parses user input such as `12`, `12.5`, `-0,99` into cents.
    ///
    /// Accepts `.` or `,` as decimal separator, rejects more than two
    /// fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let rest = rest.trim().replace(',', ".");
        if rest.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (units, fraction) = match rest.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (rest.as_str(), ""),
        };
        if units.is_empty()
            || !units.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(MoneyParseError::Invalid);
        }

        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| MoneyParseError::Invalid)? * 10,
            2 => fraction.parse().map_err(|_| MoneyParseError::Invalid)?,
            _ => return Err(MoneyParseError::TooManyDecimals),
        };
        let units: i64 = units.parse().map_err(|_| MoneyParseError::Overflow)?;

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or(MoneyParseError::Overflow)?;

        Ok(Money(if negative { -total } else { total }))
    }
}
