//! Test helpers for autoshop-service integration tests.
//!
//! Builds the full router over the in-memory store and drives it with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use autoshop_service::{
    build_router,
    config::{
        AutoshopConfig, DatabaseConfig, Environment, JwtConfig, RateLimitConfig, SecurityConfig,
    },
    services::MockStore,
    AppState,
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const PASSWORD: &str = "secret1";
pub const VIN: &str = "1HGCM82633A004352";

pub fn test_config() -> AutoshopConfig {
    AutoshopConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "autoshop-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 5,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            issuer: "autoshop-service".to_string(),
            audience: "autoshop-clients".to_string(),
            expiry_minutes: 60,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 5,
            login_window_seconds: 900,
            register_attempts: 3,
            register_window_seconds: 3600,
        },
    }
}

/// A signed-in user.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub organisation_id: Uuid,
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MockStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MockStore::new());
        let state = AppState::new(test_config(), store.clone());
        Self {
            router: build_router(state.clone()),
            store,
            state,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers an organisation and returns its owner's session.
    pub async fn register_owner(&self, organisation: &str, email: &str) -> Session {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "organisationName": organisation,
                    "email": email,
                    "password": PASSWORD,
                    "ownerFirstName": "Olivia",
                    "ownerLastName": "Owner",
                    "ownerPhone": "+15551234567"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        session(&body)
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Creates an employee through the owner and signs them in.
    pub async fn add_employee(&self, owner: &Session, email: &str) -> Session {
        let (status, body) = self
            .post(
                "/api/v1/employees",
                &owner.token,
                json!({
                    "firstName": "Eve",
                    "lastName": "Employee",
                    "email": email,
                    "password": PASSWORD
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create employee failed: {body}");

        let (status, body) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "employee login failed: {body}");
        session(&body)
    }

    pub async fn create_client(&self, session: &Session, first: &str, last: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/api/v1/clients",
                &session.token,
                json!({ "firstName": first, "lastName": last, "phoneNumber": "+15551234567" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create client failed: {body}");
        id(&body)
    }

    pub async fn create_car(&self, session: &Session, client_id: Uuid, vin: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/api/v1/cars",
                &session.token,
                json!({
                    "make": "Honda",
                    "model": "Civic",
                    "year": 2018,
                    "vin": vin,
                    "licensePlate": "ABC-123",
                    "insuranceNumber": "INS-42",
                    "clientId": client_id
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create car failed: {body}");
        id(&body)
    }

    pub async fn create_service(&self, session: &Session, name: &str) -> Uuid {
        let (status, body) = self
            .post("/api/v1/services", &session.token, json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create service failed: {body}");
        id(&body)
    }

    /// Jane Doe with a Civic and an "Oil Change" service.
    pub async fn seed_shop(&self, session: &Session, vin: &str) -> Shop {
        let client_id = self.create_client(session, "Jane", "Doe").await;
        let car_id = self.create_car(session, client_id, vin).await;
        let service_id = self.create_service(session, "Oil Change").await;
        Shop {
            client_id,
            car_id,
            service_id,
        }
    }

    pub async fn create_bill(&self, session: &Session, body: Value) -> (StatusCode, Value) {
        self.post("/api/v1/bills", &session.token, body).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Shop {
    pub client_id: Uuid,
    pub car_id: Uuid,
    pub service_id: Uuid,
}

impl Shop {
    pub fn bill(&self, price: &str, discount: Option<Value>) -> Value {
        json!({
            "clientId": self.client_id,
            "carId": self.car_id,
            "lineItems": [{ "serviceId": self.service_id, "price": price }],
            "discount": discount
        })
    }
}

pub fn session(body: &Value) -> Session {
    Session {
        token: body["token"].as_str().unwrap().to_string(),
        user_id: id(body),
        organisation_id: Uuid::parse_str(body["organisationId"].as_str().unwrap()).unwrap(),
    }
}

pub fn id(body: &Value) -> Uuid {
    Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
}

/// Reads a decimal serialized as a JSON string.
pub fn dec(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}
