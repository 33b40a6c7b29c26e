//! # Invoice Numbering
//!
//! Billing periods and the `INV-YYYYMM-NNNN` invoice number format.
//!
//! ## Format
//! ```text
//!   INV-202610-0042
//!   ─┬─ ───┬── ──┬─
//!    │     │     └── sequence within the month, zero-padded to 4 digits
//!    │     └──────── billing period (calendar month of creation)
//!    └────────────── fixed prefix
//! ```
//!
//! The sequence restarts at `0001` every month. Sequences past `9999`
//! keep counting and simply widen (`INV-202610-10000`).
//!
//! Allocation itself lives in the database layer (an atomic per-period
//! counter); this module only composes and parses numbers.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::INVOICE_PREFIX;

// =============================================================================
// Billing Period
// =============================================================================

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    /// Creates a period, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
            return Err(ValidationError::InvalidValue {
                field: "period".to_string(),
                reason: format!("{}-{} is not a valid month", year, month),
            });
        }
        Ok(BillingPeriod { year, month })
    }

    /// Period containing the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        BillingPeriod {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Period containing the given instant (UTC).
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        BillingPeriod::from_date(at.date_naive())
    }

    #[inline]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[inline]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The `YYYYMM` key used for counters and numbers.
    pub fn key(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// The `INV-YYYYMM-` prefix shared by every number of the period.
    pub fn number_prefix(&self) -> String {
        format!("{}-{}-", INVOICE_PREFIX, self.key())
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following month.
    pub fn next(&self) -> BillingPeriod {
        if self.month == 12 {
            BillingPeriod {
                year: self.year + 1,
                month: 1,
            }
        } else {
            BillingPeriod {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Half-open date range `[first day, first day of next month)`.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (self.first_day(), self.next().first_day())
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Accepts `YYYYMM` and `YYYY-MM`.
impl FromStr for BillingPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ValidationError::InvalidFormat {
            field: "period".to_string(),
            reason: format!("expected YYYY-MM or YYYYMM, got '{}'", s),
        };

        if !s.is_ascii() {
            return Err(invalid());
        }

        let (year, month) = match s.len() {
            6 if s.chars().all(|c| c.is_ascii_digit()) => (&s[..4], &s[4..]),
            7 if s.as_bytes()[4] == b'-' => (&s[..4], &s[5..]),
            _ => return Err(invalid()),
        };

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        BillingPeriod::new(year, month)
    }
}

// =============================================================================
// Invoice Number
// =============================================================================

/// A parsed invoice number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvoiceNumber {
    period: BillingPeriod,
    sequence: u32,
}

impl InvoiceNumber {
    /// Composes a number from its period and a sequence starting at 1.
    pub fn new(period: BillingPeriod, sequence: u32) -> Result<Self, ValidationError> {
        if sequence == 0 {
            return Err(ValidationError::MustBePositive {
                field: "sequence".to_string(),
            });
        }
        Ok(InvoiceNumber { period, sequence })
    }

    #[inline]
    pub fn period(&self) -> BillingPeriod {
        self.period
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04}", self.period.number_prefix(), self.sequence)
    }
}

impl FromStr for InvoiceNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "invoice_number".to_string(),
            reason: format!("expected {}-YYYYMM-NNNN, got '{}'", INVOICE_PREFIX, s),
        };

        let mut parts = s.trim().splitn(3, '-');
        let (prefix, period, sequence) = match (parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(period), Some(sequence)) => (prefix, period, sequence),
            _ => return Err(invalid()),
        };

        if prefix != INVOICE_PREFIX
            || period.len() != 6
            || sequence.len() < 4
            || !sequence.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let period: BillingPeriod = period.parse().map_err(|_| invalid())?;
        let sequence: u32 = sequence.parse().map_err(|_| invalid())?;
        InvoiceNumber::new(period, sequence).map_err(|_| invalid())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn period(year: i32, month: u32) -> BillingPeriod {
        BillingPeriod::new(year, month).unwrap()
    }

    #[test]
    fn test_format_is_zero_padded() {
        let number = InvoiceNumber::new(period(2026, 3), 7).unwrap();
        assert_eq!(number.to_string(), "INV-202603-0007");
    }

    #[test]
    fn test_sequence_widens_past_four_digits() {
        let number = InvoiceNumber::new(period(2026, 3), 10_000).unwrap();
        assert_eq!(number.to_string(), "INV-202603-10000");
        assert_eq!("INV-202603-10000".parse::<InvoiceNumber>().unwrap(), number);
    }

    #[test]
    fn test_parse() {
        let number: InvoiceNumber = "INV-202612-0042".parse().unwrap();
        assert_eq!(number.period(), period(2026, 12));
        assert_eq!(number.sequence(), 42);

        assert!("INV-202613-0001".parse::<InvoiceNumber>().is_err());
        assert!("INV-202612-42".parse::<InvoiceNumber>().is_err());
        assert!("BILL-202612-0042".parse::<InvoiceNumber>().is_err());
        assert!("INV-202612-0000".parse::<InvoiceNumber>().is_err());
        assert!("garbage".parse::<InvoiceNumber>().is_err());
    }

    #[test]
    fn test_period_parse_both_forms() {
        assert_eq!("2026-10".parse::<BillingPeriod>().unwrap(), period(2026, 10));
        assert_eq!("202610".parse::<BillingPeriod>().unwrap(), period(2026, 10));
        assert!("2026-13".parse::<BillingPeriod>().is_err());
        assert!("26-10".parse::<BillingPeriod>().is_err());
    }

    #[test]
    fn test_period_rollover() {
        assert_eq!(period(2026, 12).next(), period(2027, 1));

        let (start, end) = period(2026, 2).date_range();
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn test_prefix() {
        assert_eq!(period(2026, 1).number_prefix(), "INV-202601-");
        assert_eq!(period(2026, 1).key(), "202601");
        assert_eq!(period(2026, 1).to_string(), "2026-01");
    }
}
