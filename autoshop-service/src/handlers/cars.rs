use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{CarQuery, CarRequest, CarResponse};
use crate::middleware::AuthUser;
use crate::utils::{ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::AppState;

pub async fn create_car(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CarRequest>,
) -> Result<(StatusCode, Json<CarResponse>), AppError> {
    let car = state.catalog_service.create_car(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(car.into())))
}

pub async fn list_cars(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedQuery(query): ValidatedQuery<CarQuery>,
) -> Result<Json<Vec<CarResponse>>, AppError> {
    let cars = state.catalog_service.list_cars(&ctx, &query.into()).await?;
    Ok(Json(cars.into_iter().map(Into::into).collect()))
}

pub async fn get_car(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(car_id): ValidatedPath<Uuid>,
) -> Result<Json<CarResponse>, AppError> {
    Ok(Json(state.catalog_service.get_car(&ctx, car_id).await?.into()))
}

pub async fn update_car(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(car_id): ValidatedPath<Uuid>,
    ValidatedJson(req): ValidatedJson<CarRequest>,
) -> Result<Json<CarResponse>, AppError> {
    let car = state.catalog_service.update_car(&ctx, car_id, req).await?;
    Ok(Json(car.into()))
}

pub async fn delete_car(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(car_id): ValidatedPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog_service.delete_car(&ctx, car_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
