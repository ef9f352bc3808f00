//! HTTP handlers for autoshop-service.

pub mod auth;
pub mod bills;
pub mod cars;
pub mod clients;
pub mod employees;
pub mod health;
pub mod organisation;
pub mod reports;
pub mod services;
