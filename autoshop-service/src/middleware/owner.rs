use axum::{extract::Request, middleware::Next, response::Response};
use service_core::error::AppError;

use crate::models::AuthContext;
use crate::services::require_owner;

/// Role gate for owner-only routes. Must run after [`super::auth_middleware`].
pub async fn owner_only_middleware(req: Request, next: Next) -> Result<Response, AppError> {
    let ctx = req
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing authorization token")))?;

    if let Err(e) = require_owner(ctx) {
        tracing::warn!(user_id = %ctx.user_id, path = %req.uri().path(), "Owner-only route refused");
        return Err(e.into());
    }

    Ok(next.run(req).await)
}
