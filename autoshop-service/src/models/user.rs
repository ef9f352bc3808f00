//! User model - staff accounts scoped to one organisation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Staff role. Exactly one owner per organisation, created at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Role {
    Owner,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Employee => "employee",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub organisation_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub created_utc: DateTime<Utc>,
}

impl User {
    pub fn new(
        organisation_id: Uuid,
        first_name: String,
        last_name: String,
        email: &str,
        phone: Option<String>,
        password_hash: String,
        role: Role,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            organisation_id,
            first_name,
            last_name,
            email: normalize_email(email),
            phone,
            password_hash,
            role,
            created_utc: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

/// Emails are compared case-insensitively; they are stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
