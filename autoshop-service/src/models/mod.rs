//! Domain models for autoshop-service.

mod bill;
mod car;
mod client;
mod context;
mod organisation;
mod report;
mod service;
mod user;

pub use bill::{
    Bill, BillDetails, BillFilter, BillLineItem, BillTotals, Discount, DiscountType, NewBill,
    NewLineItem,
};
pub use car::{Car, CarFilter};
pub use client::{Client, ClientFilter};
pub use context::AuthContext;
pub use organisation::Organisation;
pub use report::IncomeSummary;
pub use service::Service;
pub use user::{normalize_email, Role, User};
