//! Services layer for autoshop-service.
//!
//! Business rules live here; persistence goes through [`ShopStore`].

pub mod auth;
pub mod bill_number;
mod billing;
mod catalog;
mod database;
pub mod error;
mod jwt;
pub mod metrics;
mod mock_store;
mod store;

pub use auth::{require_owner, AuthService};
pub use billing::{BillingService, MAX_ALLOCATION_ATTEMPTS};
pub use catalog::CatalogService;
pub use database::Database;
pub use error::{ConflictKind, Entity, ServiceError};
pub use jwt::{AccessTokenClaims, JwtService};
pub use mock_store::MockStore;
pub use store::{ClientDependents, ShopStore};
