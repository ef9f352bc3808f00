//! PostgreSQL store for autoshop-service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use super::bill_number;
use super::metrics::DB_QUERY_DURATION;
use super::store::{ClientDependents, ShopStore};
use super::{ConflictKind, ServiceError};
use crate::models::{
    Bill, BillDetails, BillFilter, BillLineItem, Car, CarFilter, Client, ClientFilter, NewBill,
    Organisation, Role, Service, User,
};

const USER_COLUMNS: &str = "user_id, organisation_id, first_name, last_name, email, phone, \
     password_hash, role, created_utc";

const CAR_COLUMNS: &str = "car_id, organisation_id, client_id, make, model, year, color, vin, \
     license_plate, insurance_number, mileage, engine_type, transmission, number_of_doors, \
     created_utc";

const BILL_COLUMNS: &str = "bill_id, organisation_id, bill_number, client_id, car_id, \
     bill_date, subtotal, discount_type, discount_value, total_amount, notes, created_by, \
     created_utc";

/// Maps unique-constraint violations to the conflict they represent.
fn map_write_error(e: sqlx::Error) -> ServiceError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            let kind = match db_err.constraint() {
                Some("users_email_key") => Some(ConflictKind::EmailExists),
                Some("cars_vin_key") => Some(ConflictKind::VinExists),
                Some("services_organisation_name_key") => Some(ConflictKind::ServiceNameExists),
                Some("bills_organisation_number_key") => Some(ConflictKind::BillNumberTaken),
                _ => None,
            };
            if let Some(kind) = kind {
                return ServiceError::Conflict(kind);
            }
        }
    }
    ServiceError::Database(e)
}

/// Maps a `ON DELETE RESTRICT` violation to `kind`.
fn map_delete_error(e: sqlx::Error, kind: ConflictKind) -> ServiceError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            ServiceError::Conflict(kind)
        }
        _ => ServiceError::Database(e),
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "autoshop-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn line_items_for(
        &self,
        bill_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<BillLineItem>>, ServiceError> {
        let items = sqlx::query_as::<_, BillLineItem>(
            r#"
            SELECT line_item_id, bill_id, service_id, service_name, price, position
            FROM bill_line_items
            WHERE bill_id = ANY($1)
            ORDER BY bill_id, position
            "#,
        )
        .bind(bill_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_bill: HashMap<Uuid, Vec<BillLineItem>> = HashMap::new();
        for item in items {
            by_bill.entry(item.bill_id).or_default().push(item);
        }
        Ok(by_bill)
    }

    async fn with_line_items(&self, bills: Vec<Bill>) -> Result<Vec<BillDetails>, ServiceError> {
        let ids: Vec<Uuid> = bills.iter().map(|b| b.bill_id).collect();
        let mut items = self.line_items_for(&ids).await?;

        Ok(bills
            .into_iter()
            .map(|bill| {
                let line_items = items.remove(&bill.bill_id).unwrap_or_default();
                BillDetails { bill, line_items }
            })
            .collect())
    }

    async fn insert_line_items(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        items: &[BillLineItem],
    ) -> Result<(), sqlx::Error> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO bill_line_items (line_item_id, bill_id, service_id, service_name, price, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(item.line_item_id)
            .bind(item.bill_id)
            .bind(item.service_id)
            .bind(&item.service_name)
            .bind(item.price)
            .bind(item.position)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ShopStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Organisation and user operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, organisation, owner), fields(organisation_id = %organisation.organisation_id))]
    async fn create_organisation_with_owner(
        &self,
        organisation: &Organisation,
        owner: &User,
    ) -> Result<(), ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_organisation"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO organisations (organisation_id, name, location, subscription_start_utc, subscription_due_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(organisation.organisation_id)
        .bind(&organisation.name)
        .bind(&organisation.location)
        .bind(organisation.subscription_start_utc)
        .bind(organisation.subscription_due_utc)
        .bind(organisation.created_utc)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (user_id, organisation_id, first_name, last_name, email, phone, password_hash, role, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(owner.user_id)
        .bind(owner.organisation_id)
        .bind(&owner.first_name)
        .bind(&owner.last_name)
        .bind(&owner.email)
        .bind(&owner.phone)
        .bind(&owner.password_hash)
        .bind(owner.role)
        .bind(owner.created_utc)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            tx.rollback().await.ok();
            return Err(map_write_error(e));
        }

        tx.commit().await?;
        timer.observe_duration();

        info!(organisation_id = %organisation.organisation_id, "Organisation registered");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_organisation(
        &self,
        organisation_id: Uuid,
    ) -> Result<Option<Organisation>, ServiceError> {
        let organisation = sqlx::query_as::<_, Organisation>(
            r#"
            SELECT organisation_id, name, location, subscription_start_utc, subscription_due_utc, created_utc
            FROM organisations
            WHERE organisation_id = $1
            "#,
        )
        .bind(organisation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(organisation)
    }

    #[instrument(skip(self, organisation), fields(organisation_id = %organisation.organisation_id))]
    async fn update_organisation(
        &self,
        organisation: &Organisation,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            "UPDATE organisations SET name = $2, location = $3 WHERE organisation_id = $1",
        )
        .bind(organisation.organisation_id)
        .bind(&organisation.name)
        .bind(&organisation.location)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self, user), fields(organisation_id = %user.organisation_id))]
    async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, organisation_id, first_name, last_name, email, phone, password_hash, role, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.user_id)
        .bind(user.organisation_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_users_by_role(
        &self,
        organisation_id: Uuid,
        role: Role,
    ) -> Result<Vec<User>, ServiceError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE organisation_id = $1 AND role = $2 ORDER BY last_name, first_name",
            USER_COLUMNS
        ))
        .bind(organisation_id)
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, organisation_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM users WHERE organisation_id = $1 AND user_id = $2")
            .bind(organisation_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Client operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, client), fields(organisation_id = %client.organisation_id))]
    async fn insert_client(&self, client: &Client) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO clients (client_id, organisation_id, first_name, last_name, phone_number, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(client.client_id)
        .bind(client.organisation_id)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.phone_number)
        .bind(client.created_utc)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_client(
        &self,
        organisation_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, ServiceError> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, organisation_id, first_name, last_name, phone_number, created_utc
            FROM clients
            WHERE organisation_id = $1 AND client_id = $2
            "#,
        )
        .bind(organisation_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(client)
    }

    #[instrument(skip(self, filter))]
    async fn list_clients(
        &self,
        organisation_id: Uuid,
        filter: &ClientFilter,
    ) -> Result<Vec<Client>, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, organisation_id, first_name, last_name, phone_number, created_utc
            FROM clients
            WHERE organisation_id = $1
              AND ($2::TEXT IS NULL
                   OR strpos(first_name || ' ' || last_name, $2) > 0
                   OR strpos(first_name, $2) > 0
                   OR strpos(last_name, $2) > 0)
              AND ($3::TEXT IS NULL OR strpos(phone_number, $3) > 0)
            ORDER BY created_utc, client_id
            "#,
        )
        .bind(organisation_id)
        .bind(&filter.name)
        .bind(&filter.phone_number)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(clients)
    }

    #[instrument(skip(self, client), fields(organisation_id = %client.organisation_id, client_id = %client.client_id))]
    async fn update_client(&self, client: &Client) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE clients SET first_name = $3, last_name = $4, phone_number = $5
            WHERE organisation_id = $1 AND client_id = $2
            "#,
        )
        .bind(client.organisation_id)
        .bind(client.client_id)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.phone_number)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn client_dependents(
        &self,
        organisation_id: Uuid,
        client_id: Uuid,
    ) -> Result<ClientDependents, ServiceError> {
        let (cars, bills) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM cars WHERE organisation_id = $1 AND client_id = $2),
                (SELECT COUNT(*) FROM bills WHERE organisation_id = $1 AND client_id = $2)
            "#,
        )
        .bind(organisation_id)
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ClientDependents { cars, bills })
    }

    #[instrument(skip(self))]
    async fn delete_client(
        &self,
        organisation_id: Uuid,
        client_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM clients WHERE organisation_id = $1 AND client_id = $2")
            .bind(organisation_id)
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_delete_error(e, ConflictKind::ClientHasDependents))?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Car operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, car), fields(organisation_id = %car.organisation_id))]
    async fn insert_car(&self, car: &Car) -> Result<(), ServiceError> {
        sqlx::query(&format!(
            "INSERT INTO cars ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            CAR_COLUMNS
        ))
        .bind(car.car_id)
        .bind(car.organisation_id)
        .bind(car.client_id)
        .bind(&car.make)
        .bind(&car.model)
        .bind(car.year)
        .bind(&car.color)
        .bind(&car.vin)
        .bind(&car.license_plate)
        .bind(&car.insurance_number)
        .bind(car.mileage)
        .bind(&car.engine_type)
        .bind(&car.transmission)
        .bind(car.number_of_doors)
        .bind(car.created_utc)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_car(
        &self,
        organisation_id: Uuid,
        car_id: Uuid,
    ) -> Result<Option<Car>, ServiceError> {
        let car = sqlx::query_as::<_, Car>(&format!(
            "SELECT {} FROM cars WHERE organisation_id = $1 AND car_id = $2",
            CAR_COLUMNS
        ))
        .bind(organisation_id)
        .bind(car_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(car)
    }

    #[instrument(skip(self, vin))]
    async fn vin_exists(&self, vin: &str, excluding: Option<Uuid>) -> Result<bool, ServiceError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM cars WHERE vin = $1 AND ($2::UUID IS NULL OR car_id <> $2))",
        )
        .bind(vin)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    #[instrument(skip(self, filter))]
    async fn list_cars(
        &self,
        organisation_id: Uuid,
        filter: &CarFilter,
    ) -> Result<Vec<Car>, ServiceError> {
        let cars = sqlx::query_as::<_, Car>(&format!(
            r#"
            SELECT {}
            FROM cars
            WHERE organisation_id = $1
              AND ($2::TEXT IS NULL OR strpos(vin, $2) > 0)
              AND ($3::TEXT IS NULL OR strpos(license_plate, $3) > 0)
            ORDER BY created_utc, car_id
            "#,
            CAR_COLUMNS
        ))
        .bind(organisation_id)
        .bind(&filter.vin)
        .bind(&filter.license_plate)
        .fetch_all(&self.pool)
        .await?;
        Ok(cars)
    }

    #[instrument(skip(self, car), fields(organisation_id = %car.organisation_id, car_id = %car.car_id))]
    async fn update_car(&self, car: &Car) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE cars SET
                client_id = $3, make = $4, model = $5, year = $6, color = $7, vin = $8,
                license_plate = $9, insurance_number = $10, mileage = $11, engine_type = $12,
                transmission = $13, number_of_doors = $14
            WHERE organisation_id = $1 AND car_id = $2
            "#,
        )
        .bind(car.organisation_id)
        .bind(car.car_id)
        .bind(car.client_id)
        .bind(&car.make)
        .bind(&car.model)
        .bind(car.year)
        .bind(&car.color)
        .bind(&car.vin)
        .bind(&car.license_plate)
        .bind(&car.insurance_number)
        .bind(car.mileage)
        .bind(&car.engine_type)
        .bind(&car.transmission)
        .bind(car.number_of_doors)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn count_bills_for_car(
        &self,
        organisation_id: Uuid,
        car_id: Uuid,
    ) -> Result<i64, ServiceError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bills WHERE organisation_id = $1 AND car_id = $2",
        )
        .bind(organisation_id)
        .bind(car_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn delete_car(&self, organisation_id: Uuid, car_id: Uuid) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM cars WHERE organisation_id = $1 AND car_id = $2")
            .bind(organisation_id)
            .bind(car_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_delete_error(e, ConflictKind::CarHasBills))?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Service catalog operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, service), fields(organisation_id = %service.organisation_id))]
    async fn insert_service(&self, service: &Service) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO services (service_id, organisation_id, name, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(service.service_id)
        .bind(service.organisation_id)
        .bind(&service.name)
        .bind(service.created_utc)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_service(
        &self,
        organisation_id: Uuid,
        service_id: Uuid,
    ) -> Result<Option<Service>, ServiceError> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            SELECT service_id, organisation_id, name, created_utc
            FROM services
            WHERE organisation_id = $1 AND service_id = $2
            "#,
        )
        .bind(organisation_id)
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(service)
    }

    #[instrument(skip(self, name))]
    async fn service_name_exists(
        &self,
        organisation_id: Uuid,
        name: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, ServiceError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM services
                WHERE organisation_id = $1 AND name = $2 AND ($3::UUID IS NULL OR service_id <> $3)
            )
            "#,
        )
        .bind(organisation_id)
        .bind(name)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    #[instrument(skip(self, service_ids), fields(service_count = service_ids.len()))]
    async fn find_services(
        &self,
        organisation_id: Uuid,
        service_ids: &[Uuid],
    ) -> Result<Vec<Service>, ServiceError> {
        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT service_id, organisation_id, name, created_utc
            FROM services
            WHERE organisation_id = $1 AND service_id = ANY($2)
            "#,
        )
        .bind(organisation_id)
        .bind(service_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }

    #[instrument(skip(self))]
    async fn list_services(&self, organisation_id: Uuid) -> Result<Vec<Service>, ServiceError> {
        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT service_id, organisation_id, name, created_utc
            FROM services
            WHERE organisation_id = $1
            ORDER BY name
            "#,
        )
        .bind(organisation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }

    #[instrument(skip(self, service), fields(organisation_id = %service.organisation_id, service_id = %service.service_id))]
    async fn update_service(&self, service: &Service) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            "UPDATE services SET name = $3 WHERE organisation_id = $1 AND service_id = $2",
        )
        .bind(service.organisation_id)
        .bind(service.service_id)
        .bind(&service.name)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn count_line_items_for_service(
        &self,
        organisation_id: Uuid,
        service_id: Uuid,
    ) -> Result<i64, ServiceError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM bill_line_items li
            JOIN bills b ON b.bill_id = li.bill_id
            WHERE b.organisation_id = $1 AND li.service_id = $2
            "#,
        )
        .bind(organisation_id)
        .bind(service_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn delete_service(
        &self,
        organisation_id: Uuid,
        service_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let result =
            sqlx::query("DELETE FROM services WHERE organisation_id = $1 AND service_id = $2")
                .bind(organisation_id)
                .bind(service_id)
                .execute(&self.pool)
                .await
                .map_err(|e| map_delete_error(e, ConflictKind::ServiceInUse))?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Bill operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, bill), fields(organisation_id = %bill.organisation_id, year = year))]
    async fn insert_bill(&self, bill: NewBill, year: i32) -> Result<BillDetails, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_bill"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let number = bill_number::allocate(&mut tx, bill.organisation_id, year).await?;
        let details = bill.into_details(Uuid::new_v4(), number.to_string());
        let b = &details.bill;

        let inserted = sqlx::query(&format!(
            "INSERT INTO bills ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            BILL_COLUMNS
        ))
        .bind(b.bill_id)
        .bind(b.organisation_id)
        .bind(&b.bill_number)
        .bind(b.client_id)
        .bind(b.car_id)
        .bind(b.bill_date)
        .bind(b.subtotal)
        .bind(b.discount_type)
        .bind(b.discount_value)
        .bind(b.total_amount)
        .bind(&b.notes)
        .bind(b.created_by)
        .bind(b.created_utc)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            tx.rollback().await.ok();
            return Err(map_write_error(e));
        }

        if let Err(e) = Self::insert_line_items(&mut tx, &details.line_items).await {
            tx.rollback().await.ok();
            return Err(map_write_error(e));
        }

        tx.commit().await?;
        timer.observe_duration();

        info!(
            bill_id = %details.bill.bill_id,
            bill_number = %details.bill.bill_number,
            line_items = details.line_items.len(),
            "Bill inserted"
        );

        Ok(details)
    }

    #[instrument(skip(self, bill), fields(organisation_id = %bill.organisation_id, bill_id = %bill_id))]
    async fn replace_bill(
        &self,
        bill_id: Uuid,
        bill: NewBill,
    ) -> Result<Option<BillDetails>, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_bill"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Bill>(&format!(
            r#"
            UPDATE bills SET
                client_id = $3, car_id = $4, bill_date = $5, subtotal = $6, discount_type = $7,
                discount_value = $8, total_amount = $9, notes = $10
            WHERE organisation_id = $1 AND bill_id = $2
            RETURNING {}
            "#,
            BILL_COLUMNS
        ))
        .bind(bill.organisation_id)
        .bind(bill_id)
        .bind(bill.client_id)
        .bind(bill.car_id)
        .bind(bill.bill_date)
        .bind(bill.totals.subtotal)
        .bind(bill.discount.map(|d| d.discount_type))
        .bind(bill.discount.map(|d| d.value))
        .bind(bill.totals.total)
        .bind(&bill.notes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            tx.rollback().await.ok();
            return Ok(None);
        };

        sqlx::query("DELETE FROM bill_line_items WHERE bill_id = $1")
            .bind(bill_id)
            .execute(&mut *tx)
            .await?;

        let line_items = bill.into_details(bill_id, row.bill_number.clone()).line_items;
        if let Err(e) = Self::insert_line_items(&mut tx, &line_items).await {
            tx.rollback().await.ok();
            return Err(map_write_error(e));
        }

        tx.commit().await?;
        timer.observe_duration();

        Ok(Some(BillDetails {
            bill: row,
            line_items,
        }))
    }

    #[instrument(skip(self))]
    async fn find_bill(
        &self,
        organisation_id: Uuid,
        bill_id: Uuid,
    ) -> Result<Option<BillDetails>, ServiceError> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {} FROM bills WHERE organisation_id = $1 AND bill_id = $2",
            BILL_COLUMNS
        ))
        .bind(organisation_id)
        .bind(bill_id)
        .fetch_optional(&self.pool)
        .await?;

        match bill {
            Some(bill) => Ok(self.with_line_items(vec![bill]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, filter))]
    async fn list_bills(
        &self,
        organisation_id: Uuid,
        filter: &BillFilter,
    ) -> Result<Vec<BillDetails>, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_bills"])
            .start_timer();

        let columns = BILL_COLUMNS
            .split(", ")
            .map(|c| format!("b.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");

        let bills = sqlx::query_as::<_, Bill>(&format!(
            r#"
            SELECT {}
            FROM bills b
            JOIN clients c ON c.client_id = b.client_id
            JOIN cars r ON r.car_id = b.car_id
            WHERE b.organisation_id = $1
              AND ($2::TEXT IS NULL
                   OR strpos(c.first_name || ' ' || c.last_name, $2) > 0
                   OR strpos(c.first_name, $2) > 0
                   OR strpos(c.last_name, $2) > 0)
              AND ($3::TEXT IS NULL OR strpos(r.license_plate, $3) > 0)
              AND ($4::TEXT IS NULL
                   OR strpos(r.make || ' ' || r.model, $4) > 0
                   OR strpos(r.make, $4) > 0
                   OR strpos(r.model, $4) > 0)
              AND ($5::TEXT IS NULL OR strpos(r.insurance_number, $5) > 0)
              AND ($6::TIMESTAMPTZ IS NULL OR b.bill_date >= $6)
              AND ($7::TIMESTAMPTZ IS NULL OR b.bill_date <= $7)
            ORDER BY b.bill_date DESC, b.bill_number DESC
            "#,
            columns
        ))
        .bind(organisation_id)
        .bind(&filter.client_name)
        .bind(&filter.license_plate)
        .bind(&filter.car_type)
        .bind(&filter.insurance_number)
        .bind(filter.date_start)
        .bind(filter.date_end)
        .fetch_all(&self.pool)
        .await?;

        let details = self.with_line_items(bills).await?;
        timer.observe_duration();
        Ok(details)
    }

    #[instrument(skip(self))]
    async fn list_bills_between(
        &self,
        organisation_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bill>, ServiceError> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            r#"
            SELECT {}
            FROM bills
            WHERE organisation_id = $1 AND bill_date >= $2 AND bill_date <= $3
            ORDER BY bill_date
            "#,
            BILL_COLUMNS
        ))
        .bind(organisation_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(bills)
    }

    #[instrument(skip(self))]
    async fn delete_bill(&self, organisation_id: Uuid, bill_id: Uuid) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM bills WHERE organisation_id = $1 AND bill_id = $2")
            .bind(organisation_id)
            .bind(bill_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn resync_bill_sequence(
        &self,
        organisation_id: Uuid,
        year: i32,
    ) -> Result<(), ServiceError> {
        let mut conn = self.pool.acquire().await?;
        bill_number::resync(&mut conn, organisation_id, year).await?;
        Ok(())
    }
}
