//! Request and response bodies. Everything on the wire is camelCase.

pub mod auth;
pub mod bill;
pub mod car;
pub mod client;
pub mod employee;
pub mod organisation;
pub mod report;
pub mod service;

pub use auth::{AuthResponse, LoginRequest, RegisterRequest};
pub use bill::{BillQuery, BillRequest, BillResponse, LineItemRequest, LineItemResponse};
pub use car::{CarQuery, CarRequest, CarResponse};
pub use client::{ClientQuery, ClientRequest, ClientResponse};
pub use employee::{CreateEmployeeRequest, UserResponse};
pub use organisation::{OrganisationResponse, UpdateOrganisationRequest};
pub use report::{IncomeQuery, IncomeReportResponse};
pub use service::{ServiceRequest, ServiceResponse};
