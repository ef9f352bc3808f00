use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::{IncomeQuery, IncomeReportResponse};
use crate::middleware::AuthUser;
use crate::utils::ValidatedQuery;
use crate::AppState;

/// GET /api/v1/reports/income?startDate=..&endDate=.. (owner only)
pub async fn income_report(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedQuery(query): ValidatedQuery<IncomeQuery>,
) -> Result<Json<IncomeReportResponse>, AppError> {
    let summary = state
        .billing_service
        .income_report(&ctx, query.start_date, query.end_date)
        .await?;
    Ok(Json(summary.into()))
}
