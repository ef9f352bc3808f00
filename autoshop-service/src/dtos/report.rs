use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::IncomeSummary;
use crate::utils::dates::deserialize_utc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeQuery {
    #[serde(deserialize_with = "deserialize_utc")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_utc")]
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeReportResponse {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_income: Decimal,
    pub total_bills: i64,
    pub total_discount_given: Decimal,
}

impl From<IncomeSummary> for IncomeReportResponse {
    fn from(summary: IncomeSummary) -> Self {
        Self {
            start_date: summary.start_date,
            end_date: summary.end_date,
            total_income: summary.total_income,
            total_bills: summary.total_bills,
            total_discount_given: summary.total_discount_given,
        }
    }
}
