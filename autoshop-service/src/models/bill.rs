//! Bill model - an invoice for work performed on a client's car.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Car, Client};

/// How a bill discount is interpreted against the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub value: Decimal,
}

impl Discount {
    /// Raw discount amount for `subtotal`; `None` on arithmetic overflow.
    pub fn amount(&self, subtotal: Decimal) -> Option<Decimal> {
        match self.discount_type {
            DiscountType::Percentage => subtotal
                .checked_mul(self.value)?
                .checked_div(Decimal::ONE_HUNDRED),
            DiscountType::Fixed => Some(self.value),
        }
    }
}

/// Monetary summary of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

impl BillTotals {
    /// subtotal = sum of prices; total = max(0, subtotal - discount).
    ///
    /// Returns `None` if any intermediate value overflows.
    pub fn compute<I>(prices: I, discount: Option<&Discount>) -> Option<Self>
    where
        I: IntoIterator<Item = Decimal>,
    {
        let subtotal = prices
            .into_iter()
            .try_fold(Decimal::ZERO, |acc, price| acc.checked_add(price))?;

        let discount_amount = match discount {
            Some(d) => d.amount(subtotal)?,
            None => Decimal::ZERO,
        };

        let total = subtotal.checked_sub(discount_amount)?.max(Decimal::ZERO);

        Some(Self {
            subtotal,
            discount_amount,
            total,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Bill {
    pub bill_id: Uuid,
    pub organisation_id: Uuid,
    pub bill_number: String,
    pub client_id: Uuid,
    pub car_id: Uuid,
    pub bill_date: DateTime<Utc>,
    pub subtotal: Decimal,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl Bill {
    pub fn discount(&self) -> Option<Discount> {
        match (self.discount_type, self.discount_value) {
            (Some(discount_type), Some(value)) => Some(Discount {
                discount_type,
                value,
            }),
            _ => None,
        }
    }

    /// Discount as computed from the stored subtotal and discount.
    pub fn discount_amount(&self) -> Decimal {
        self.discount()
            .and_then(|d| d.amount(self.subtotal))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Snapshot of a catalog service as billed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BillLineItem {
    pub line_item_id: Uuid,
    pub bill_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub price: Decimal,
    pub position: i32,
}

/// A bill together with its ordered line items.
#[derive(Debug, Clone, PartialEq)]
pub struct BillDetails {
    pub bill: Bill,
    pub line_items: Vec<BillLineItem>,
}

/// Validated input for persisting a bill. The number is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub organisation_id: Uuid,
    pub client_id: Uuid,
    pub car_id: Uuid,
    pub bill_date: DateTime<Utc>,
    pub line_items: Vec<NewLineItem>,
    pub totals: BillTotals,
    pub discount: Option<Discount>,
    pub notes: Option<String>,
    pub created_by: Uuid,
}

impl NewBill {
    /// Materializes the bill row once a number has been allocated.
    pub fn into_details(self, bill_id: Uuid, bill_number: String) -> BillDetails {
        let line_items = self
            .line_items
            .iter()
            .enumerate()
            .map(|(position, item)| BillLineItem {
                line_item_id: Uuid::new_v4(),
                bill_id,
                service_id: item.service_id,
                service_name: item.service_name.clone(),
                price: item.price,
                position: position as i32,
            })
            .collect();

        BillDetails {
            bill: Bill {
                bill_id,
                organisation_id: self.organisation_id,
                bill_number,
                client_id: self.client_id,
                car_id: self.car_id,
                bill_date: self.bill_date,
                subtotal: self.totals.subtotal,
                discount_type: self.discount.map(|d| d.discount_type),
                discount_value: self.discount.map(|d| d.value),
                total_amount: self.totals.total,
                notes: self.notes,
                created_by: self.created_by,
                created_utc: Utc::now(),
            },
            line_items,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub service_id: Uuid,
    pub service_name: String,
    pub price: Decimal,
}

/// Filter parameters for listing bills. All criteria are optional and
/// conjunctive; text criteria are case-sensitive substrings.
#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    /// Matches "first last", first name or last name of the billed client.
    pub client_name: Option<String>,
    pub license_plate: Option<String>,
    /// Matches "make model", make or model of the billed car.
    pub car_type: Option<String>,
    pub insurance_number: Option<String>,
    /// Inclusive lower bound on the bill date.
    pub date_start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the bill date.
    pub date_end: Option<DateTime<Utc>>,
}

fn optional_contains(value: Option<&str>, needle: &str) -> bool {
    value.is_some_and(|v| v.contains(needle))
}

impl BillFilter {
    pub fn matches(&self, bill: &Bill, client: &Client, car: &Car) -> bool {
        if let Some(name) = self.client_name.as_deref() {
            if !(client.full_name().contains(name)
                || client.first_name.contains(name)
                || client.last_name.contains(name))
            {
                return false;
            }
        }

        if let Some(plate) = self.license_plate.as_deref() {
            if !optional_contains(car.license_plate.as_deref(), plate) {
                return false;
            }
        }

        if let Some(car_type) = self.car_type.as_deref() {
            if !(car.car_type().contains(car_type)
                || car.make.contains(car_type)
                || car.model.contains(car_type))
            {
                return false;
            }
        }

        if let Some(insurance) = self.insurance_number.as_deref() {
            if !optional_contains(car.insurance_number.as_deref(), insurance) {
                return false;
            }
        }

        if self.date_start.is_some_and(|start| bill.bill_date < start) {
            return false;
        }

        if self.date_end.is_some_and(|end| bill.bill_date > end) {
            return false;
        }

        true
    }
}
