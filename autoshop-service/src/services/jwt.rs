use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::{Role, User};

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    expiry_minutes: i64,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub email: String,
    /// "first last"
    pub name: String,
    pub role: Role,
    pub org_id: Uuid,
    pub iss: String,
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        tracing::info!(issuer = %config.issuer, "JWT service initialized with HS256 key");

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expiry_minutes: config.expiry_minutes,
        }
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user.user_id,
            email: user.email.clone(),
            name: user.full_name(),
            role: user.role,
            org_id: user.organisation_id,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))?;

        Ok(token)
    }

    /// Validate and decode an access token: signature, issuer, audience and
    /// expiry, with no clock leeway.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid access token: {}", e))?;

        Ok(token_data.claims)
    }

    /// Get access token expiry in seconds (for client info)
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-at-least-32-bytes!".to_string(),
            issuer: "autoshop-service".to_string(),
            audience: "autoshop-clients".to_string(),
            expiry_minutes: 60,
        }
    }

    fn owner() -> User {
        User::new(
            Uuid::new_v4(),
            "Olivia".into(),
            "Owner".into(),
            "owner@acme.test",
            None,
            "hash".into(),
            Role::Owner,
        )
    }

    #[test]
    fn test_round_trip_carries_identity() {
        let jwt = JwtService::new(&config());
        let user = owner();

        let token = jwt.generate_access_token(&user).unwrap();
        let claims = jwt.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, user.user_id);
        assert_eq!(claims.org_id, user.organisation_id);
        assert_eq!(claims.role, Role::Owner);
        assert_eq!(claims.name, "Olivia Owner");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let token = JwtService::new(&config())
            .generate_access_token(&owner())
            .unwrap();

        let mut other = config();
        other.secret = "another-secret-that-is-32-bytes-long".to_string();
        assert!(JwtService::new(&other).validate_access_token(&token).is_err());
    }

    #[test]
    fn test_rejects_wrong_audience_and_issuer() {
        let token = JwtService::new(&config())
            .generate_access_token(&owner())
            .unwrap();

        let mut other = config();
        other.audience = "someone-else".to_string();
        assert!(JwtService::new(&other).validate_access_token(&token).is_err());

        let mut other = config();
        other.issuer = "someone-else".to_string();
        assert!(JwtService::new(&other).validate_access_token(&token).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let jwt = JwtService::new(&config());
        let user = owner();
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user.user_id,
            email: user.email.clone(),
            name: user.full_name(),
            role: user.role,
            org_id: user.organisation_id,
            iss: "autoshop-service".to_string(),
            aud: "autoshop-clients".to_string(),
            exp: (now - Duration::seconds(1)).timestamp(),
            iat: (now - Duration::minutes(61)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config().secret.as_bytes()),
        )
        .unwrap();

        assert!(jwt.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        let jwt = JwtService::new(&config());
        assert!(jwt.validate_access_token("not-a-token").is_err());
    }
}
