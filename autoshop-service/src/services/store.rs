//! Persistence seam for autoshop-service.
//!
//! Every tenant-owned record is read and written through an organisation id;
//! a record belonging to another organisation is indistinguishable from a
//! missing one. [`Database`](super::Database) implements this over Postgres,
//! [`MockStore`](super::MockStore) in memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::ServiceError;
use crate::models::{
    Bill, BillDetails, BillFilter, Car, CarFilter, Client, ClientFilter, NewBill, Organisation,
    Role, Service, User,
};

/// Counts of records that keep a client from being deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientDependents {
    pub cars: i64,
    pub bills: i64,
}

impl ClientDependents {
    pub fn is_empty(&self) -> bool {
        self.cars == 0 && self.bills == 0
    }
}

#[async_trait]
pub trait ShopStore: Send + Sync {
    async fn health_check(&self) -> Result<(), ServiceError>;

    // Organisations and users

    /// Persists a new organisation and its owner atomically.
    async fn create_organisation_with_owner(
        &self,
        organisation: &Organisation,
        owner: &User,
    ) -> Result<(), ServiceError>;
    async fn find_organisation(
        &self,
        organisation_id: Uuid,
    ) -> Result<Option<Organisation>, ServiceError>;
    async fn update_organisation(&self, organisation: &Organisation)
        -> Result<bool, ServiceError>;
    /// Users are looked up globally: emails are unique across organisations.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, ServiceError>;
    async fn insert_user(&self, user: &User) -> Result<(), ServiceError>;
    async fn list_users_by_role(
        &self,
        organisation_id: Uuid,
        role: Role,
    ) -> Result<Vec<User>, ServiceError>;
    async fn delete_user(&self, organisation_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError>;

    // Clients

    async fn insert_client(&self, client: &Client) -> Result<(), ServiceError>;
    async fn find_client(
        &self,
        organisation_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, ServiceError>;
    async fn list_clients(
        &self,
        organisation_id: Uuid,
        filter: &ClientFilter,
    ) -> Result<Vec<Client>, ServiceError>;
    async fn update_client(&self, client: &Client) -> Result<bool, ServiceError>;
    async fn client_dependents(
        &self,
        organisation_id: Uuid,
        client_id: Uuid,
    ) -> Result<ClientDependents, ServiceError>;
    async fn delete_client(
        &self,
        organisation_id: Uuid,
        client_id: Uuid,
    ) -> Result<bool, ServiceError>;

    // Cars

    async fn insert_car(&self, car: &Car) -> Result<(), ServiceError>;
    async fn find_car(&self, organisation_id: Uuid, car_id: Uuid)
        -> Result<Option<Car>, ServiceError>;
    /// VINs are unique across organisations.
    async fn vin_exists(&self, vin: &str, excluding: Option<Uuid>) -> Result<bool, ServiceError>;
    async fn list_cars(
        &self,
        organisation_id: Uuid,
        filter: &CarFilter,
    ) -> Result<Vec<Car>, ServiceError>;
    async fn update_car(&self, car: &Car) -> Result<bool, ServiceError>;
    async fn count_bills_for_car(
        &self,
        organisation_id: Uuid,
        car_id: Uuid,
    ) -> Result<i64, ServiceError>;
    async fn delete_car(&self, organisation_id: Uuid, car_id: Uuid) -> Result<bool, ServiceError>;

    // Service catalog

    async fn insert_service(&self, service: &Service) -> Result<(), ServiceError>;
    async fn find_service(
        &self,
        organisation_id: Uuid,
        service_id: Uuid,
    ) -> Result<Option<Service>, ServiceError>;
    async fn service_name_exists(
        &self,
        organisation_id: Uuid,
        name: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, ServiceError>;
    /// Returns the services among `service_ids` that exist in the organisation.
    async fn find_services(
        &self,
        organisation_id: Uuid,
        service_ids: &[Uuid],
    ) -> Result<Vec<Service>, ServiceError>;
    async fn list_services(&self, organisation_id: Uuid) -> Result<Vec<Service>, ServiceError>;
    async fn update_service(&self, service: &Service) -> Result<bool, ServiceError>;
    async fn count_line_items_for_service(
        &self,
        organisation_id: Uuid,
        service_id: Uuid,
    ) -> Result<i64, ServiceError>;
    async fn delete_service(
        &self,
        organisation_id: Uuid,
        service_id: Uuid,
    ) -> Result<bool, ServiceError>;

    // Bills

    /// Allocates the next bill number for `(organisation, year)` and persists
    /// the bill with its line items in one atomic step.
    ///
    /// A bill number collision is reported as
    /// `Conflict(ConflictKind::BillNumberTaken)` with nothing persisted.
    async fn insert_bill(&self, bill: NewBill, year: i32) -> Result<BillDetails, ServiceError>;
    /// Replaces every field and line item of an existing bill, keeping its
    /// number, creator and creation time. `None` when the bill is missing.
    async fn replace_bill(
        &self,
        bill_id: Uuid,
        bill: NewBill,
    ) -> Result<Option<BillDetails>, ServiceError>;
    async fn find_bill(
        &self,
        organisation_id: Uuid,
        bill_id: Uuid,
    ) -> Result<Option<BillDetails>, ServiceError>;
    async fn list_bills(
        &self,
        organisation_id: Uuid,
        filter: &BillFilter,
    ) -> Result<Vec<BillDetails>, ServiceError>;
    async fn list_bills_between(
        &self,
        organisation_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bill>, ServiceError>;
    async fn delete_bill(&self, organisation_id: Uuid, bill_id: Uuid) -> Result<bool, ServiceError>;
    /// Raises the `(organisation, year)` counter to at least the greatest
    /// well-formed bill number already stored for that year.
    async fn resync_bill_sequence(&self, organisation_id: Uuid, year: i32)
        -> Result<(), ServiceError>;
}
