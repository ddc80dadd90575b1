use std::{
    fmt,
    iter::Sum,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

/// Money amount represented as integer **minor units** (cents).
///
/// Use this type for **all** monetary values in the engine (totals, shares,
/// accrued interest) so that split sums are exact instead of approximate.
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Computes `self * numerator / denominator`, rounding half away from
    /// zero.
    ///
    /// Intermediates are `i128`, so `numerator` may be as large as a product
    /// of a rate and a period count. Returns `None` when `denominator` is not
    /// positive or the result does not fit.
    ///
    /// ```rust
    /// use engine::MoneyCents;
    ///
    /// // 1/3 of 1.00 rounds down, 2/3 rounds up.
    /// assert_eq!(MoneyCents::new(100).mul_div_round(1, 3), Some(MoneyCents::new(33)));
    /// assert_eq!(MoneyCents::new(100).mul_div_round(2, 3), Some(MoneyCents::new(67)));
    /// ```
    #[must_use]
    pub fn mul_div_round(self, numerator: i128, denominator: i128) -> Option<MoneyCents> {
        if denominator <= 0 {
            return None;
        }
        let product = i128::from(self.0).checked_mul(numerator)?;
        let half = denominator / 2;
        let rounded = if product >= 0 {
            product.checked_add(half)? / denominator
        } else {
            product.checked_sub(half)? / denominator
        };
        i64::try_from(rounded).ok().map(MoneyCents)
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, |acc, value| acc + value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(MoneyCents::new(0).to_string(), "0.00");
        assert_eq!(MoneyCents::new(1).to_string(), "0.01");
        assert_eq!(MoneyCents::new(1050).to_string(), "10.50");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn mul_div_round_rounds_half_away_from_zero() {
        assert_eq!(MoneyCents::new(5).mul_div_round(1, 2), Some(MoneyCents::new(3)));
        assert_eq!(MoneyCents::new(-5).mul_div_round(1, 2), Some(MoneyCents::new(-3)));
        assert_eq!(MoneyCents::new(10_000).mul_div_round(150, 10_000), Some(MoneyCents::new(150)));
        assert_eq!(MoneyCents::new(1).mul_div_round(1, 0), None);
        assert_eq!(MoneyCents::new(i64::MAX).mul_div_round(2, 1), None);
    }

    #[test]
    fn sum_adds_all_values() {
        let total: MoneyCents = [34, 33, 33].into_iter().map(MoneyCents::new).sum();
        assert_eq!(total, MoneyCents::new(100));
    }
}
