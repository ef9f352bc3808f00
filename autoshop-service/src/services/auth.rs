//! Credential issuing and employee management.

use std::sync::Arc;

use uuid::Uuid;

use super::metrics::AUTH_ATTEMPTS_TOTAL;
use super::{ConflictKind, Entity, JwtService, ServiceError, ShopStore};
use crate::dtos::{AuthResponse, CreateEmployeeRequest, LoginRequest, RegisterRequest};
use crate::models::{normalize_email, AuthContext, Organisation, Role, User};
use crate::utils::password::DUMMY_PASSWORD_HASH;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// Fails with `Forbidden` unless the caller owns their organisation.
pub fn require_owner(ctx: &AuthContext) -> Result<(), ServiceError> {
    if ctx.is_owner() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Only the organisation owner can perform this action".to_string(),
        ))
    }
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn ShopStore>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(store: Arc<dyn ShopStore>, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    /// Creates an organisation and its owner, then signs them in.
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        let email = normalize_email(&req.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            AUTH_ATTEMPTS_TOTAL
                .with_label_values(&["register", "conflict"])
                .inc();
            return Err(ServiceError::Conflict(ConflictKind::EmailExists));
        }

        let password_hash = hash(&req.password)?;

        let organisation = Organisation::new(req.organisation_name.trim().to_string());
        let owner = User::new(
            organisation.organisation_id,
            req.owner_first_name,
            req.owner_last_name,
            &email,
            Some(req.owner_phone),
            password_hash.into_string(),
            Role::Owner,
        );

        self.store
            .create_organisation_with_owner(&organisation, &owner)
            .await?;

        tracing::info!(
            user_id = %owner.user_id,
            organisation_id = %organisation.organisation_id,
            "Organisation registered"
        );
        AUTH_ATTEMPTS_TOTAL
            .with_label_values(&["register", "success"])
            .inc();

        self.issue(&owner, organisation)
    }

    /// Unknown emails and wrong passwords fail identically, and both run one
    /// password verification.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ServiceError> {
        let email = normalize_email(&req.email);
        let password = Password::new(req.password);

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            if let Some(dummy) = DUMMY_PASSWORD_HASH.as_ref() {
                let _ = verify_password(&password, dummy);
            }
            AUTH_ATTEMPTS_TOTAL
                .with_label_values(&["login", "failure"])
                .inc();
            return Err(ServiceError::invalid_credentials());
        };

        let stored = PasswordHashString::new(user.password_hash.clone());
        if verify_password(&password, &stored).is_err() {
            tracing::warn!(user_id = %user.user_id, "Failed login attempt");
            AUTH_ATTEMPTS_TOTAL
                .with_label_values(&["login", "failure"])
                .inc();
            return Err(ServiceError::invalid_credentials());
        }

        let organisation = self
            .store
            .find_organisation(user.organisation_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Organisation))?;

        AUTH_ATTEMPTS_TOTAL
            .with_label_values(&["login", "success"])
            .inc();
        tracing::info!(user_id = %user.user_id, "User logged in");

        self.issue(&user, organisation)
    }

    pub async fn create_employee(
        &self,
        ctx: &AuthContext,
        req: CreateEmployeeRequest,
    ) -> Result<User, ServiceError> {
        let email = normalize_email(&req.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(ConflictKind::EmailExists));
        }

        let password_hash = hash(&req.password)?;
        let employee = User::new(
            ctx.organisation_id,
            req.first_name,
            req.last_name,
            &email,
            req.phone.filter(|p| !p.trim().is_empty()),
            password_hash.into_string(),
            Role::Employee,
        );

        self.store.insert_user(&employee).await?;

        tracing::info!(
            user_id = %employee.user_id,
            organisation_id = %ctx.organisation_id,
            "Employee created"
        );
        Ok(employee)
    }

    pub async fn list_employees(&self, ctx: &AuthContext) -> Result<Vec<User>, ServiceError> {
        self.store
            .list_users_by_role(ctx.organisation_id, Role::Employee)
            .await
    }

    pub async fn delete_employee(
        &self,
        ctx: &AuthContext,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        let target = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::User))?;

        if target.organisation_id != ctx.organisation_id {
            tracing::warn!(
                caller = %ctx.user_id,
                target = %user_id,
                "Cross-organisation employee deletion rejected"
            );
            return Err(ServiceError::Forbidden(
                "You can only delete employees from your own organisation".to_string(),
            ));
        }
        if target.is_owner() {
            return Err(ServiceError::Forbidden(
                "Cannot delete an organisation owner".to_string(),
            ));
        }
        if target.user_id == ctx.user_id {
            return Err(ServiceError::Forbidden(
                "Cannot delete your own account".to_string(),
            ));
        }

        if !self.store.delete_user(ctx.organisation_id, user_id).await? {
            return Err(ServiceError::NotFound(Entity::User));
        }

        tracing::info!(user_id = %user_id, organisation_id = %ctx.organisation_id, "Employee deleted");
        Ok(())
    }

    fn issue(&self, user: &User, organisation: Organisation) -> Result<AuthResponse, ServiceError> {
        let token = self.jwt.generate_access_token(user)?;
        Ok(AuthResponse::new(
            user,
            organisation,
            token,
            self.jwt.access_token_expiry_seconds(),
        ))
    }
}

fn hash(password: &str) -> Result<PasswordHashString, ServiceError> {
    hash_password(&Password::new(password.to_string()))
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::MockStore;

    fn service() -> AuthService {
        let jwt = JwtService::new(&JwtConfig {
            secret: "test-secret-that-is-at-least-32-bytes!".to_string(),
            issuer: "autoshop-service".to_string(),
            audience: "autoshop-clients".to_string(),
            expiry_minutes: 60,
        });
        AuthService::new(Arc::new(MockStore::new()), jwt)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            organisation_name: "Acme".to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
            owner_first_name: "Olivia".to_string(),
            owner_last_name: "Owner".to_string(),
            owner_phone: "+15551234567".to_string(),
        }
    }

    fn ctx(response: &AuthResponse) -> AuthContext {
        AuthContext {
            user_id: response.id,
            organisation_id: response.organisation_id,
            role: response.role,
            email: response.email.clone(),
            name: format!("{} {}", response.first_name, response.last_name),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service();
        let registered = auth.register(register_request("Owner@Acme.test")).await.unwrap();
        assert_eq!(registered.role, Role::Owner);
        assert_eq!(registered.email, "owner@acme.test");
        assert_eq!(registered.organisation.name, "Acme");

        let logged_in = auth
            .login(LoginRequest {
                email: "owner@acme.test".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.id, registered.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let auth = service();
        auth.register(register_request("owner@acme.test")).await.unwrap();
        let err = auth
            .register(register_request("owner@acme.test"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Conflict(crate::services::ConflictKind::EmailExists)
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let auth = service();
        auth.register(register_request("owner@acme.test")).await.unwrap();

        let wrong_password = auth
            .login(LoginRequest {
                email: "owner@acme.test".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap_err();
        let unknown_email = auth
            .login(LoginRequest {
                email: "nobody@acme.test".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_owner_cannot_be_deleted() {
        let auth = service();
        let owner = auth.register(register_request("owner@acme.test")).await.unwrap();

        let err = auth
            .delete_employee(&ctx(&owner), owner.id)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete an organisation owner");
    }

    #[test]
    fn test_require_owner() {
        let mut ctx = AuthContext {
            user_id: Uuid::new_v4(),
            organisation_id: Uuid::new_v4(),
            role: Role::Employee,
            email: "e@acme.test".into(),
            name: "E E".into(),
        };
        assert!(matches!(require_owner(&ctx), Err(ServiceError::Forbidden(_))));
        ctx.role = Role::Owner;
        assert!(require_owner(&ctx).is_ok());
    }
}
