use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{BillDetails, BillFilter, BillLineItem, Discount};
use crate::utils::dates::deserialize_optional_utc;

/// Body for both creating and replacing a bill.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BillRequest {
    pub client_id: Uuid,
    pub car_id: Uuid,

    /// Defaults to the time of creation.
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    pub date: Option<DateTime<Utc>>,

    #[serde(default, alias = "servicesPerformed")]
    #[validate(nested)]
    pub line_items: Vec<LineItemRequest>,

    pub discount: Option<Discount>,

    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub service_id: Uuid,

    /// Blank or missing names are filled from the service catalog.
    #[serde(default)]
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    pub price: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub service_id: Uuid,
    pub name: String,
    pub price: Decimal,
}

impl From<BillLineItem> for LineItemResponse {
    fn from(item: BillLineItem) -> Self {
        Self {
            service_id: item.service_id,
            name: item.service_name,
            price: item.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillResponse {
    pub id: Uuid,
    pub bill_number: String,
    pub client_id: Uuid,
    pub car_id: Uuid,
    pub date: DateTime<Utc>,
    pub line_items: Vec<LineItemResponse>,
    pub subtotal: Decimal,
    pub discount: Option<Discount>,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<BillDetails> for BillResponse {
    fn from(details: BillDetails) -> Self {
        let BillDetails { bill, line_items } = details;
        let discount = bill.discount();
        let discount_amount = bill.discount_amount();

        Self {
            id: bill.bill_id,
            bill_number: bill.bill_number,
            client_id: bill.client_id,
            car_id: bill.car_id,
            date: bill.bill_date,
            line_items: line_items.into_iter().map(Into::into).collect(),
            subtotal: bill.subtotal,
            discount,
            discount_amount,
            total_amount: bill.total_amount,
            notes: bill.notes,
            created_by_id: bill.created_by,
            created_at: bill.created_utc,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillQuery {
    pub client_name: Option<String>,
    pub license_plate: Option<String>,
    pub car_type: Option<String>,
    pub insurance_number: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    pub date_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    pub date_end: Option<DateTime<Utc>>,
}

impl From<BillQuery> for BillFilter {
    fn from(query: BillQuery) -> Self {
        Self {
            client_name: query.client_name.filter(|s| !s.is_empty()),
            license_plate: query.license_plate.filter(|s| !s.is_empty()),
            car_type: query.car_type.filter(|s| !s.is_empty()),
            insurance_number: query.insurance_number.filter(|s| !s.is_empty()),
            date_start: query.date_start,
            date_end: query.date_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscountType;
    use std::str::FromStr;

    #[test]
    fn test_accepts_legacy_line_item_field_and_numeric_prices() {
        let req: BillRequest = serde_json::from_value(serde_json::json!({
            "clientId": Uuid::new_v4(),
            "carId": Uuid::new_v4(),
            "servicesPerformed": [
                { "serviceId": Uuid::new_v4(), "name": "Oil Change", "price": 49.99 },
                { "serviceId": Uuid::new_v4(), "price": "10.00" }
            ],
            "discount": { "type": "percentage", "value": 10 }
        }))
        .unwrap();

        assert_eq!(req.line_items.len(), 2);
        assert_eq!(req.line_items[0].price, Decimal::from_str("49.99").unwrap());
        assert_eq!(req.line_items[1].name, None);
        assert_eq!(req.date, None);
        assert_eq!(
            req.discount.map(|d| d.discount_type),
            Some(DiscountType::Percentage)
        );
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_discount_type() {
        let result = serde_json::from_value::<BillRequest>(serde_json::json!({
            "clientId": Uuid::new_v4(),
            "carId": Uuid::new_v4(),
            "lineItems": [],
            "discount": { "type": "bogo", "value": 1 }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_accepts_date_only() {
        let req: BillRequest = serde_json::from_value(serde_json::json!({
            "clientId": Uuid::new_v4(),
            "carId": Uuid::new_v4(),
            "date": "2025-03-01"
        }))
        .unwrap();
        assert_eq!(req.date.unwrap().to_rfc3339(), "2025-03-01T00:00:00+00:00");
    }
}
