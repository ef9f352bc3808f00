//! Bill endpoints.

use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{BillQuery, BillRequest, BillResponse};
use crate::middleware::AuthUser;
use crate::utils::{ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::AppState;

/// POST /api/v1/bills
pub async fn create_bill(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<BillRequest>,
) -> Result<(StatusCode, Json<BillResponse>), AppError> {
    let bill = state.billing_service.create_bill(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(bill.into())))
}

/// GET /api/v1/bills
///
/// Optional filters: clientName, licensePlate, carType, insuranceNumber,
/// dateStart, dateEnd.
pub async fn list_bills(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedQuery(query): ValidatedQuery<BillQuery>,
) -> Result<Json<Vec<BillResponse>>, AppError> {
    let bills = state
        .billing_service
        .list_bills(&ctx, &query.into())
        .await?;
    Ok(Json(bills.into_iter().map(Into::into).collect()))
}

pub async fn get_bill(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(bill_id): ValidatedPath<Uuid>,
) -> Result<Json<BillResponse>, AppError> {
    let bill = state.billing_service.get_bill(&ctx, bill_id).await?;
    Ok(Json(bill.into()))
}

/// PUT /api/v1/bills/:id
pub async fn update_bill(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(bill_id): ValidatedPath<Uuid>,
    ValidatedJson(req): ValidatedJson<BillRequest>,
) -> Result<Json<BillResponse>, AppError> {
    let bill = state
        .billing_service
        .update_bill(&ctx, bill_id, req)
        .await?;
    Ok(Json(bill.into()))
}

pub async fn delete_bill(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(bill_id): ValidatedPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.billing_service.delete_bill(&ctx, bill_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
