use uuid::Uuid;

use super::Role;

/// Identity of the authenticated caller, taken from a verified token.
///
/// Every tenant-owned read and write is scoped to `organisation_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub organisation_id: Uuid,
    pub role: Role,
    pub email: String,
    pub name: String,
}

impl AuthContext {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}
