//! In-memory [`ShopStore`] for tests and local experiments.
//!
//! All state sits behind one mutex, so every operation is atomic. The same
//! uniqueness and referential rules as the Postgres schema are enforced.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::bill_number::{latest_for_year, BillNumber};
use super::store::{ClientDependents, ShopStore};
use super::{ConflictKind, ServiceError};
use crate::models::{
    Bill, BillDetails, BillFilter, Car, CarFilter, Client, ClientFilter, NewBill, Organisation,
    Role, Service, User,
};

#[derive(Default)]
struct MockState {
    organisations: HashMap<Uuid, Organisation>,
    users: HashMap<Uuid, User>,
    clients: Vec<Client>,
    cars: Vec<Car>,
    services: Vec<Service>,
    bills: Vec<BillDetails>,
    bill_sequences: HashMap<(Uuid, i32), i64>,
}

impl MockState {
    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|u| u.email == email)
    }

    fn bill_number_taken(&self, organisation_id: Uuid, number: &str) -> bool {
        self.bills
            .iter()
            .any(|b| b.bill.organisation_id == organisation_id && b.bill.bill_number == number)
    }

    fn latest_bill_number(&self, organisation_id: Uuid, year: i32) -> i64 {
        latest_for_year(
            self.bills
                .iter()
                .filter(|b| b.bill.organisation_id == organisation_id)
                .map(|b| b.bill.bill_number.as_str()),
            year,
        )
        .map(|n| n.sequence)
        .unwrap_or(0)
    }

    fn bill_matches(&self, details: &BillDetails, filter: &BillFilter) -> bool {
        let bill = &details.bill;
        let client = self.clients.iter().find(|c| c.client_id == bill.client_id);
        let car = self.cars.iter().find(|c| c.car_id == bill.car_id);

        match (client, car) {
            (Some(client), Some(car)) => filter.matches(bill, client, car),
            _ => false,
        }
    }
}

pub struct MockStore {
    state: Mutex<MockState>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, ServiceError> {
        self.state
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Mock store mutex poisoned: {}", e)))
    }

    /// Stores a bill verbatim, bypassing allocation. Simulates numbers that
    /// were written outside the counter (imports, manual fixes).
    pub fn seed_bill(&self, details: BillDetails) -> Result<(), ServiceError> {
        self.lock()?.bills.push(details);
        Ok(())
    }
}

#[async_trait]
impl ShopStore for MockStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.lock().map(|_| ())
    }

    async fn create_organisation_with_owner(
        &self,
        organisation: &Organisation,
        owner: &User,
    ) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        if state.email_taken(&owner.email) {
            return Err(ServiceError::Conflict(ConflictKind::EmailExists));
        }
        state
            .organisations
            .insert(organisation.organisation_id, organisation.clone());
        state.users.insert(owner.user_id, owner.clone());
        Ok(())
    }

    async fn find_organisation(
        &self,
        organisation_id: Uuid,
    ) -> Result<Option<Organisation>, ServiceError> {
        Ok(self.lock()?.organisations.get(&organisation_id).cloned())
    }

    async fn update_organisation(
        &self,
        organisation: &Organisation,
    ) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        match state.organisations.get_mut(&organisation.organisation_id) {
            Some(existing) => {
                existing.name = organisation.name.clone();
                existing.location = organisation.location.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        if state.email_taken(&user.email) {
            return Err(ServiceError::Conflict(ConflictKind::EmailExists));
        }
        state.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn list_users_by_role(
        &self,
        organisation_id: Uuid,
        role: Role,
    ) -> Result<Vec<User>, ServiceError> {
        let mut users: Vec<User> = self
            .lock()?
            .users
            .values()
            .filter(|u| u.organisation_id == organisation_id && u.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
        });
        Ok(users)
    }

    async fn delete_user(&self, organisation_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        let in_organisation = state
            .users
            .get(&user_id)
            .is_some_and(|u| u.organisation_id == organisation_id);
        if in_organisation {
            state.users.remove(&user_id);
        }
        Ok(in_organisation)
    }

    async fn insert_client(&self, client: &Client) -> Result<(), ServiceError> {
        self.lock()?.clients.push(client.clone());
        Ok(())
    }

    async fn find_client(
        &self,
        organisation_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, ServiceError> {
        Ok(self
            .lock()?
            .clients
            .iter()
            .find(|c| c.organisation_id == organisation_id && c.client_id == client_id)
            .cloned())
    }

    async fn list_clients(
        &self,
        organisation_id: Uuid,
        filter: &ClientFilter,
    ) -> Result<Vec<Client>, ServiceError> {
        Ok(self
            .lock()?
            .clients
            .iter()
            .filter(|c| c.organisation_id == organisation_id && filter.matches(c))
            .cloned()
            .collect())
    }

    async fn update_client(&self, client: &Client) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        match state.clients.iter_mut().find(|c| {
            c.organisation_id == client.organisation_id && c.client_id == client.client_id
        }) {
            Some(existing) => {
                existing.first_name = client.first_name.clone();
                existing.last_name = client.last_name.clone();
                existing.phone_number = client.phone_number.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn client_dependents(
        &self,
        organisation_id: Uuid,
        client_id: Uuid,
    ) -> Result<ClientDependents, ServiceError> {
        let state = self.lock()?;
        let cars = state
            .cars
            .iter()
            .filter(|c| c.organisation_id == organisation_id && c.client_id == client_id)
            .count();
        let bills = state
            .bills
            .iter()
            .filter(|b| b.bill.organisation_id == organisation_id && b.bill.client_id == client_id)
            .count();
        Ok(ClientDependents {
            cars: cars as i64,
            bills: bills as i64,
        })
    }

    async fn delete_client(
        &self,
        organisation_id: Uuid,
        client_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        if state.cars.iter().any(|c| c.client_id == client_id)
            || state.bills.iter().any(|b| b.bill.client_id == client_id)
        {
            return Err(ServiceError::Conflict(ConflictKind::ClientHasDependents));
        }
        let before = state.clients.len();
        state
            .clients
            .retain(|c| !(c.organisation_id == organisation_id && c.client_id == client_id));
        Ok(state.clients.len() < before)
    }

    async fn insert_car(&self, car: &Car) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        if state.cars.iter().any(|c| c.vin == car.vin) {
            return Err(ServiceError::Conflict(ConflictKind::VinExists));
        }
        state.cars.push(car.clone());
        Ok(())
    }

    async fn find_car(
        &self,
        organisation_id: Uuid,
        car_id: Uuid,
    ) -> Result<Option<Car>, ServiceError> {
        Ok(self
            .lock()?
            .cars
            .iter()
            .find(|c| c.organisation_id == organisation_id && c.car_id == car_id)
            .cloned())
    }

    async fn vin_exists(&self, vin: &str, excluding: Option<Uuid>) -> Result<bool, ServiceError> {
        Ok(self
            .lock()?
            .cars
            .iter()
            .any(|c| c.vin == vin && Some(c.car_id) != excluding))
    }

    async fn list_cars(
        &self,
        organisation_id: Uuid,
        filter: &CarFilter,
    ) -> Result<Vec<Car>, ServiceError> {
        Ok(self
            .lock()?
            .cars
            .iter()
            .filter(|c| c.organisation_id == organisation_id && filter.matches(c))
            .cloned()
            .collect())
    }

    async fn update_car(&self, car: &Car) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        if state
            .cars
            .iter()
            .any(|c| c.vin == car.vin && c.car_id != car.car_id)
        {
            return Err(ServiceError::Conflict(ConflictKind::VinExists));
        }
        match state
            .cars
            .iter_mut()
            .find(|c| c.organisation_id == car.organisation_id && c.car_id == car.car_id)
        {
            Some(existing) => {
                *existing = Car {
                    created_utc: existing.created_utc,
                    ..car.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_bills_for_car(
        &self,
        organisation_id: Uuid,
        car_id: Uuid,
    ) -> Result<i64, ServiceError> {
        Ok(self
            .lock()?
            .bills
            .iter()
            .filter(|b| b.bill.organisation_id == organisation_id && b.bill.car_id == car_id)
            .count() as i64)
    }

    async fn delete_car(&self, organisation_id: Uuid, car_id: Uuid) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        if state.bills.iter().any(|b| b.bill.car_id == car_id) {
            return Err(ServiceError::Conflict(ConflictKind::CarHasBills));
        }
        let before = state.cars.len();
        state
            .cars
            .retain(|c| !(c.organisation_id == organisation_id && c.car_id == car_id));
        Ok(state.cars.len() < before)
    }

    async fn insert_service(&self, service: &Service) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        if state
            .services
            .iter()
            .any(|s| s.organisation_id == service.organisation_id && s.name == service.name)
        {
            return Err(ServiceError::Conflict(ConflictKind::ServiceNameExists));
        }
        state.services.push(service.clone());
        Ok(())
    }

    async fn find_service(
        &self,
        organisation_id: Uuid,
        service_id: Uuid,
    ) -> Result<Option<Service>, ServiceError> {
        Ok(self
            .lock()?
            .services
            .iter()
            .find(|s| s.organisation_id == organisation_id && s.service_id == service_id)
            .cloned())
    }

    async fn service_name_exists(
        &self,
        organisation_id: Uuid,
        name: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, ServiceError> {
        Ok(self.lock()?.services.iter().any(|s| {
            s.organisation_id == organisation_id
                && s.name == name
                && Some(s.service_id) != excluding
        }))
    }

    async fn find_services(
        &self,
        organisation_id: Uuid,
        service_ids: &[Uuid],
    ) -> Result<Vec<Service>, ServiceError> {
        Ok(self
            .lock()?
            .services
            .iter()
            .filter(|s| s.organisation_id == organisation_id && service_ids.contains(&s.service_id))
            .cloned()
            .collect())
    }

    async fn list_services(&self, organisation_id: Uuid) -> Result<Vec<Service>, ServiceError> {
        let mut services: Vec<Service> = self
            .lock()?
            .services
            .iter()
            .filter(|s| s.organisation_id == organisation_id)
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn update_service(&self, service: &Service) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        if state.services.iter().any(|s| {
            s.organisation_id == service.organisation_id
                && s.name == service.name
                && s.service_id != service.service_id
        }) {
            return Err(ServiceError::Conflict(ConflictKind::ServiceNameExists));
        }
        match state.services.iter_mut().find(|s| {
            s.organisation_id == service.organisation_id && s.service_id == service.service_id
        }) {
            Some(existing) => {
                existing.name = service.name.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_line_items_for_service(
        &self,
        organisation_id: Uuid,
        service_id: Uuid,
    ) -> Result<i64, ServiceError> {
        Ok(self
            .lock()?
            .bills
            .iter()
            .filter(|b| b.bill.organisation_id == organisation_id)
            .flat_map(|b| b.line_items.iter())
            .filter(|item| item.service_id == service_id)
            .count() as i64)
    }

    async fn delete_service(
        &self,
        organisation_id: Uuid,
        service_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        if state
            .bills
            .iter()
            .flat_map(|b| b.line_items.iter())
            .any(|item| item.service_id == service_id)
        {
            return Err(ServiceError::Conflict(ConflictKind::ServiceInUse));
        }
        let before = state.services.len();
        state
            .services
            .retain(|s| !(s.organisation_id == organisation_id && s.service_id == service_id));
        Ok(state.services.len() < before)
    }

    async fn insert_bill(&self, bill: NewBill, year: i32) -> Result<BillDetails, ServiceError> {
        let mut state = self.lock()?;
        let organisation_id = bill.organisation_id;

        let sequence = match state.bill_sequences.get(&(organisation_id, year)) {
            Some(last) => last + 1,
            None => state.latest_bill_number(organisation_id, year) + 1,
        };
        let number = BillNumber::new(year, sequence).to_string();

        // A collision aborts the whole step, counter included.
        if state.bill_number_taken(organisation_id, &number) {
            return Err(ServiceError::Conflict(ConflictKind::BillNumberTaken));
        }

        state
            .bill_sequences
            .insert((organisation_id, year), sequence);
        let details = bill.into_details(Uuid::new_v4(), number);
        state.bills.push(details.clone());
        Ok(details)
    }

    async fn replace_bill(
        &self,
        bill_id: Uuid,
        bill: NewBill,
    ) -> Result<Option<BillDetails>, ServiceError> {
        let mut state = self.lock()?;
        let organisation_id = bill.organisation_id;
        let Some(existing) = state
            .bills
            .iter_mut()
            .find(|b| b.bill.organisation_id == organisation_id && b.bill.bill_id == bill_id)
        else {
            return Ok(None);
        };

        let mut replaced = NewBill {
            created_by: existing.bill.created_by,
            ..bill
        }
        .into_details(bill_id, existing.bill.bill_number.clone());
        replaced.bill.created_utc = existing.bill.created_utc;

        *existing = replaced.clone();
        Ok(Some(replaced))
    }

    async fn find_bill(
        &self,
        organisation_id: Uuid,
        bill_id: Uuid,
    ) -> Result<Option<BillDetails>, ServiceError> {
        Ok(self
            .lock()?
            .bills
            .iter()
            .find(|b| b.bill.organisation_id == organisation_id && b.bill.bill_id == bill_id)
            .cloned())
    }

    async fn list_bills(
        &self,
        organisation_id: Uuid,
        filter: &BillFilter,
    ) -> Result<Vec<BillDetails>, ServiceError> {
        let state = self.lock()?;
        let mut bills: Vec<BillDetails> = state
            .bills
            .iter()
            .filter(|b| b.bill.organisation_id == organisation_id && state.bill_matches(b, filter))
            .cloned()
            .collect();
        bills.sort_by(|a, b| {
            (b.bill.bill_date, &b.bill.bill_number).cmp(&(a.bill.bill_date, &a.bill.bill_number))
        });
        Ok(bills)
    }

    async fn list_bills_between(
        &self,
        organisation_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bill>, ServiceError> {
        Ok(self
            .lock()?
            .bills
            .iter()
            .map(|b| &b.bill)
            .filter(|b| {
                b.organisation_id == organisation_id && b.bill_date >= start && b.bill_date <= end
            })
            .cloned()
            .collect())
    }

    async fn delete_bill(&self, organisation_id: Uuid, bill_id: Uuid) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        let before = state.bills.len();
        state
            .bills
            .retain(|b| !(b.bill.organisation_id == organisation_id && b.bill.bill_id == bill_id));
        Ok(state.bills.len() < before)
    }

    async fn resync_bill_sequence(
        &self,
        organisation_id: Uuid,
        year: i32,
    ) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        let latest = state.latest_bill_number(organisation_id, year);
        let counter = state
            .bill_sequences
            .entry((organisation_id, year))
            .or_insert(0);
        *counter = (*counter).max(latest);
        Ok(())
    }
}
