use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::{AuthResponse, LoginRequest, RegisterRequest};
use crate::utils::ValidatedJson;
use crate::AppState;

/// Register a new organisation and its owner.
///
/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let response = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password.
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(state.auth_service.login(req).await?))
}
