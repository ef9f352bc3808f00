//! Income report aggregation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::Bill;

#[derive(Debug, Clone, PartialEq)]
pub struct IncomeSummary {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_income: Decimal,
    pub total_bills: i64,
    pub total_discount_given: Decimal,
}

impl IncomeSummary {
    /// Aggregates the bills dated within `[start_date, end_date]`.
    ///
    /// The discount total sums each bill's discount amount, even where the
    /// discount exceeded the subtotal. Returns `None` on overflow.
    pub fn from_bills(
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        bills: &[Bill],
    ) -> Option<Self> {
        let in_range = bills
            .iter()
            .filter(|b| b.bill_date >= start_date && b.bill_date <= end_date);

        let mut summary = Self {
            start_date,
            end_date,
            total_income: Decimal::ZERO,
            total_bills: 0,
            total_discount_given: Decimal::ZERO,
        };

        for bill in in_range {
            summary.total_income = summary.total_income.checked_add(bill.total_amount)?;
            summary.total_discount_given = summary
                .total_discount_given
                .checked_add(bill.discount_amount())?;
            summary.total_bills += 1;
        }

        Some(summary)
    }
}
