//! Employee management, owner only.

use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{CreateEmployeeRequest, UserResponse};
use crate::middleware::AuthUser;
use crate::utils::{ValidatedJson, ValidatedPath};
use crate::AppState;

pub async fn create_employee(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let employee = state.auth_service.create_employee(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(employee.into())))
}

pub async fn list_employees(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let employees = state.auth_service.list_employees(&ctx).await?;
    Ok(Json(employees.into_iter().map(Into::into).collect()))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(user_id): ValidatedPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.auth_service.delete_employee(&ctx, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
