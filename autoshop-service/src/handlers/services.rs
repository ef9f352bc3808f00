//! Service catalog endpoints.

use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{ServiceRequest, ServiceResponse};
use crate::middleware::AuthUser;
use crate::utils::{ValidatedJson, ValidatedPath};
use crate::AppState;

pub async fn create_service(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<ServiceRequest>,
) -> Result<(StatusCode, Json<ServiceResponse>), AppError> {
    let service = state.catalog_service.create_service(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(service.into())))
}

pub async fn list_services(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<Vec<ServiceResponse>>, AppError> {
    let services = state.catalog_service.list_services(&ctx).await?;
    Ok(Json(services.into_iter().map(Into::into).collect()))
}

pub async fn get_service(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(service_id): ValidatedPath<Uuid>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service = state.catalog_service.get_service(&ctx, service_id).await?;
    Ok(Json(service.into()))
}

pub async fn update_service(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(service_id): ValidatedPath<Uuid>,
    ValidatedJson(req): ValidatedJson<ServiceRequest>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service = state
        .catalog_service
        .update_service(&ctx, service_id, req)
        .await?;
    Ok(Json(service.into()))
}

pub async fn delete_service(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(service_id): ValidatedPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .catalog_service
        .delete_service(&ctx, service_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
