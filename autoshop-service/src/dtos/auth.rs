use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::OrganisationResponse;
use crate::models::{Organisation, Role, User};
use crate::utils::validation::{validate_not_blank, validate_phone};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 100, message = "Organisation name must be 1-100 characters"),
        custom(function = "validate_not_blank", message = "Organisation name is required")
    )]
    pub organisation_name: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 100, message = "Email must be at most 100 characters")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub owner_first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub owner_last_name: String,

    #[validate(
        length(min = 1, max = 20, message = "Phone must be 1-20 characters"),
        custom(function = "validate_phone", message = "Invalid phone number")
    )]
    pub owner_phone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Returned by register and login: the user summary, its organisation and
/// a bearer token.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub organisation_id: Uuid,
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub organisation: OrganisationResponse,
}

impl AuthResponse {
    pub fn new(user: &User, organisation: Organisation, token: String, expires_in: i64) -> Self {
        Self {
            id: user.user_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            organisation_id: user.organisation_id,
            token,
            token_type: "Bearer".to_string(),
            expires_in,
            organisation: organisation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register() -> RegisterRequest {
        serde_json::from_value(serde_json::json!({
            "organisationName": "Acme",
            "email": "owner@acme.test",
            "password": "secret1",
            "ownerFirstName": "Olivia",
            "ownerLastName": "Owner",
            "ownerPhone": "+15551234567"
        }))
        .unwrap()
    }

    #[test]
    fn test_register_accepts_camel_case_body() {
        let req = register();
        assert_eq!(req.organisation_name, "Acme");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_rejects_short_password_and_bad_email() {
        let mut req = register();
        req.password = "12345".into();
        req.email = "not-an-email".into();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_register_rejects_bad_phone() {
        let mut req = register();
        req.owner_phone = "call me".into();
        assert!(req.validate().is_err());
    }
}
