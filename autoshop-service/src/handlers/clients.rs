use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{ClientQuery, ClientRequest, ClientResponse};
use crate::middleware::AuthUser;
use crate::utils::{ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::AppState;

pub async fn create_client(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<ClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), AppError> {
    let client = state.catalog_service.create_client(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(client.into())))
}

pub async fn list_clients(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedQuery(query): ValidatedQuery<ClientQuery>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    let clients = state
        .catalog_service
        .list_clients(&ctx, &query.into())
        .await?;
    Ok(Json(clients.into_iter().map(Into::into).collect()))
}

pub async fn get_client(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(client_id): ValidatedPath<Uuid>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = state.catalog_service.get_client(&ctx, client_id).await?;
    Ok(Json(client.into()))
}

pub async fn update_client(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(client_id): ValidatedPath<Uuid>,
    ValidatedJson(req): ValidatedJson<ClientRequest>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = state
        .catalog_service
        .update_client(&ctx, client_id, req)
        .await?;
    Ok(Json(client.into()))
}

pub async fn delete_client(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedPath(client_id): ValidatedPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog_service.delete_client(&ctx, client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
