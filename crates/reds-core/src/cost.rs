//! Booked acquisition cost of a lot.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::intern::InternedStr;
use crate::Amount;

/// The per-unit acquisition cost of a position, as resolved by the host's
/// booking pass.
///
/// Buying 10 AAPL at 150 USD on 2024-01-15 yields a cost of
/// `{150 USD, 2024-01-15}`; a later sale of those shares carries the same
/// cost on its reducing posting, which is how holding periods are measured.
///
/// ```
/// use reds_core::Cost;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let cost = Cost::new(dec!(150.00), "USD")
///     .with_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
///
/// assert_eq!(cost.total_cost(dec!(-4)).number, dec!(-600.00));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cost {
    /// Cost per unit
    pub number: Decimal,
    /// Currency of the cost
    pub currency: InternedStr,
    /// Acquisition date
    pub date: Option<NaiveDate>,
    /// Lot label
    pub label: Option<String>,
}

impl Cost {
    /// Create a new cost with the given number and currency.
    #[must_use]
    pub fn new(number: Decimal, currency: impl Into<InternedStr>) -> Self {
        Self {
            number,
            currency: currency.into(),
            date: None,
            label: None,
        }
    }

    /// Set the acquisition date.
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the lot label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Total cost of `units` units of this lot.
    #[must_use]
    pub fn total_cost(&self, units: Decimal) -> Amount {
        Amount::new(units * self.number, self.currency.clone())
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {}", self.number, self.currency)?;
        if let Some(date) = self.date {
            write!(f, ", {date}")?;
        }
        if let Some(label) = &self.label {
            write!(f, ", \"{label}\"")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_display_full() {
        let cost = Cost::new(dec!(150.00), "USD")
            .with_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .with_label("lot1");
        assert_eq!(cost.to_string(), "{150.00 USD, 2024-01-15, \"lot1\"}");
    }

    #[test]
    fn test_display_bare() {
        assert_eq!(Cost::new(dec!(2), "EUR").to_string(), "{2 EUR}");
    }
}
