use service_core::error::AppError;
use thiserror::Error;

/// Record kinds that can be reported missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Organisation,
    User,
    Client,
    Car,
    Service,
    Bill,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Entity::Organisation => "Organisation",
            Entity::User => "User",
            Entity::Client => "Client",
            Entity::Car => "Car",
            Entity::Service => "Service",
            Entity::Bill => "Bill",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    EmailExists,
    VinExists,
    ServiceNameExists,
    BillNumberTaken,
    CarClientMismatch,
    ClientHasDependents,
    CarHasBills,
    ServiceInUse,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConflictKind::EmailExists => "User with this email already exists",
            ConflictKind::VinExists => "Car with this VIN already exists",
            ConflictKind::ServiceNameExists => "Service with this name already exists",
            ConflictKind::BillNumberTaken => "Bill number already allocated",
            ConflictKind::CarClientMismatch => "Car does not belong to the specified client",
            ConflictKind::ClientHasDependents => {
                "Cannot delete client with associated cars or bills"
            }
            ConflictKind::CarHasBills => "Cannot delete car with associated bills",
            ConflictKind::ServiceInUse => "Cannot delete service that is used in bills",
        })
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("{0}")]
    Conflict(ConflictKind),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn invalid_credentials() -> Self {
        ServiceError::Unauthorized("Invalid email or password".to_string())
    }

    pub fn invalid_token() -> Self {
        ServiceError::Unauthorized("Invalid token".to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(entity) => {
                AppError::NotFound(anyhow::anyhow!("{} not found", entity))
            }
            ServiceError::Conflict(kind) => AppError::Conflict(anyhow::anyhow!("{}", kind)),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Unauthorized(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            ServiceError::Forbidden(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::StatusCode;

    #[test]
    fn test_mapping_to_http_status() {
        let cases = [
            (ServiceError::NotFound(Entity::Client), StatusCode::NOT_FOUND),
            (
                ServiceError::Conflict(ConflictKind::VinExists),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::Validation("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::invalid_token(), StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (
                ServiceError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_not_found_message_names_entity() {
        let err = AppError::from(ServiceError::NotFound(Entity::Car));
        assert_eq!(err.to_string(), "Not found: Car not found");
    }
}
