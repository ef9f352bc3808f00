//! Billing engine: validates bill input against the caller's records,
//! computes totals, snapshots line items and allocates bill numbers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::metrics::{BILLS_TOTAL, BILL_NUMBER_RETRIES_TOTAL};
use super::{ConflictKind, Entity, ServiceError, ShopStore};
use crate::dtos::BillRequest;
use crate::models::{
    AuthContext, BillDetails, BillFilter, BillTotals, Discount, DiscountType, IncomeSummary,
    NewBill, NewLineItem,
};

/// Insert attempts per bill before a number collision is reported.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn ShopStore>,
}

impl BillingService {
    pub fn new(store: Arc<dyn ShopStore>) -> Self {
        Self { store }
    }

    pub async fn create_bill(
        &self,
        ctx: &AuthContext,
        req: BillRequest,
    ) -> Result<BillDetails, ServiceError> {
        let now = Utc::now();
        let bill = self.prepare(ctx, req, now).await?;
        let year = now.year();

        let mut attempt = 1;
        let details = loop {
            match self.store.insert_bill(bill.clone(), year).await {
                Ok(details) => break details,
                Err(ServiceError::Conflict(ConflictKind::BillNumberTaken))
                    if attempt < MAX_ALLOCATION_ATTEMPTS =>
                {
                    BILL_NUMBER_RETRIES_TOTAL.inc();
                    tracing::warn!(
                        organisation_id = %ctx.organisation_id,
                        year,
                        attempt,
                        "Bill number collision, resyncing counter"
                    );
                    self.store
                        .resync_bill_sequence(ctx.organisation_id, year)
                        .await?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        BILLS_TOTAL.with_label_values(&["created"]).inc();
        tracing::info!(
            bill_id = %details.bill.bill_id,
            bill_number = %details.bill.bill_number,
            total = %details.bill.total_amount,
            "Bill created"
        );
        Ok(details)
    }

    /// Replaces every field and line item; the number, creator and creation
    /// time stay as they were.
    pub async fn update_bill(
        &self,
        ctx: &AuthContext,
        bill_id: Uuid,
        req: BillRequest,
    ) -> Result<BillDetails, ServiceError> {
        let existing = self.get_bill(ctx, bill_id).await?;
        let bill = self.prepare(ctx, req, existing.bill.bill_date).await?;

        let details = self
            .store
            .replace_bill(bill_id, bill)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Bill))?;

        BILLS_TOTAL.with_label_values(&["updated"]).inc();
        tracing::info!(bill_id = %bill_id, "Bill updated");
        Ok(details)
    }

    pub async fn delete_bill(&self, ctx: &AuthContext, bill_id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete_bill(ctx.organisation_id, bill_id).await? {
            return Err(ServiceError::NotFound(Entity::Bill));
        }
        BILLS_TOTAL.with_label_values(&["deleted"]).inc();
        tracing::info!(bill_id = %bill_id, "Bill deleted");
        Ok(())
    }

    pub async fn get_bill(
        &self,
        ctx: &AuthContext,
        bill_id: Uuid,
    ) -> Result<BillDetails, ServiceError> {
        self.store
            .find_bill(ctx.organisation_id, bill_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Bill))
    }

    pub async fn list_bills(
        &self,
        ctx: &AuthContext,
        filter: &BillFilter,
    ) -> Result<Vec<BillDetails>, ServiceError> {
        self.store.list_bills(ctx.organisation_id, filter).await
    }

    /// Income over bills dated within `[start, end]`.
    pub async fn income_report(
        &self,
        ctx: &AuthContext,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<IncomeSummary, ServiceError> {
        super::auth::require_owner(ctx)?;

        if start >= end {
            return Err(ServiceError::Validation(
                "Start date must be before end date".to_string(),
            ));
        }

        let bills = self
            .store
            .list_bills_between(ctx.organisation_id, start, end)
            .await?;
        IncomeSummary::from_bills(start, end, &bills).ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!("Income report totals overflow"))
        })
    }

    /// Checks `req` against the caller's organisation and turns it into a
    /// bill ready to persist. Nothing is written.
    async fn prepare(
        &self,
        ctx: &AuthContext,
        req: BillRequest,
        default_date: DateTime<Utc>,
    ) -> Result<NewBill, ServiceError> {
        validate_amounts(&req)?;

        let org = ctx.organisation_id;

        let client = self
            .store
            .find_client(org, req.client_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Client))?;
        let car = self
            .store
            .find_car(org, req.car_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Car))?;
        if car.client_id != client.client_id {
            return Err(ServiceError::Conflict(ConflictKind::CarClientMismatch));
        }

        let mut service_ids: Vec<Uuid> = req.line_items.iter().map(|i| i.service_id).collect();
        service_ids.sort_unstable();
        service_ids.dedup();

        let catalog: HashMap<Uuid, String> = if service_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .find_services(org, &service_ids)
                .await?
                .into_iter()
                .map(|s| (s.service_id, s.name))
                .collect()
        };
        if service_ids.iter().any(|id| !catalog.contains_key(id)) {
            return Err(ServiceError::NotFound(Entity::Service));
        }

        let line_items: Vec<NewLineItem> = req
            .line_items
            .into_iter()
            .map(|item| {
                let service_name = match item.name.as_deref().map(str::trim) {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => catalog.get(&item.service_id).cloned().unwrap_or_default(),
                };
                NewLineItem {
                    service_id: item.service_id,
                    service_name,
                    price: item.price,
                }
            })
            .collect();

        let totals = BillTotals::compute(line_items.iter().map(|i| i.price), req.discount.as_ref())
            .ok_or_else(|| ServiceError::Validation("Bill amounts are out of range".to_string()))?;

        Ok(NewBill {
            organisation_id: org,
            client_id: client.client_id,
            car_id: car.car_id,
            bill_date: req.date.unwrap_or(default_date),
            line_items,
            totals,
            discount: req.discount,
            notes: req.notes.filter(|n| !n.trim().is_empty()),
            created_by: ctx.user_id,
        })
    }
}

fn validate_amounts(req: &BillRequest) -> Result<(), ServiceError> {
    if req.line_items.iter().any(|i| i.price < Decimal::ZERO) {
        return Err(ServiceError::Validation(
            "Line item prices must not be negative".to_string(),
        ));
    }

    if let Some(Discount {
        discount_type,
        value,
    }) = req.discount
    {
        if value < Decimal::ZERO {
            return Err(ServiceError::Validation(
                "Discount value must not be negative".to_string(),
            ));
        }
        if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
            return Err(ServiceError::Validation(
                "Percentage discount must not exceed 100".to_string(),
            ));
        }
    }

    Ok(())
}
