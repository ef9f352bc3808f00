use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::{OrganisationResponse, UpdateOrganisationRequest};
use crate::middleware::AuthUser;
use crate::utils::ValidatedJson;
use crate::AppState;

/// GET /api/v1/organisation
pub async fn get_organisation(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<OrganisationResponse>, AppError> {
    let organisation = state.catalog_service.get_organisation(&ctx).await?;
    Ok(Json(organisation.into()))
}

/// PUT /api/v1/organisation (owner only)
pub async fn update_organisation(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateOrganisationRequest>,
) -> Result<Json<OrganisationResponse>, AppError> {
    let organisation = state
        .catalog_service
        .update_organisation(&ctx, req)
        .await?;
    Ok(Json(organisation.into()))
}
