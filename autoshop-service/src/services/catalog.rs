//! Clients, cars, the service catalog and the organisation profile.
//!
//! Referential checks run before any write so the first violated rule is
//! the one reported. The store enforces the same rules again as a backstop.

use std::sync::Arc;

use uuid::Uuid;

use super::{ConflictKind, Entity, ServiceError, ShopStore};
use crate::dtos::{CarRequest, ClientRequest, ServiceRequest, UpdateOrganisationRequest};
use crate::models::{
    AuthContext, Car, CarFilter, Client, ClientFilter, Organisation, Service,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ShopStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ShopStore>) -> Self {
        Self { store }
    }

    // Organisation

    pub async fn get_organisation(&self, ctx: &AuthContext) -> Result<Organisation, ServiceError> {
        self.store
            .find_organisation(ctx.organisation_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Organisation))
    }

    pub async fn update_organisation(
        &self,
        ctx: &AuthContext,
        req: UpdateOrganisationRequest,
    ) -> Result<Organisation, ServiceError> {
        super::auth::require_owner(ctx)?;

        let mut organisation = self.get_organisation(ctx).await?;
        organisation.name = req.name.trim().to_string();
        organisation.location = req.location.unwrap_or_default();

        if !self.store.update_organisation(&organisation).await? {
            return Err(ServiceError::NotFound(Entity::Organisation));
        }
        Ok(organisation)
    }

    // Clients

    pub async fn create_client(
        &self,
        ctx: &AuthContext,
        req: ClientRequest,
    ) -> Result<Client, ServiceError> {
        let client = Client::new(
            ctx.organisation_id,
            req.first_name,
            req.last_name,
            req.phone_number,
        );
        self.store.insert_client(&client).await?;
        tracing::info!(client_id = %client.client_id, "Client created");
        Ok(client)
    }

    pub async fn list_clients(
        &self,
        ctx: &AuthContext,
        filter: &ClientFilter,
    ) -> Result<Vec<Client>, ServiceError> {
        self.store.list_clients(ctx.organisation_id, filter).await
    }

    pub async fn get_client(&self, ctx: &AuthContext, client_id: Uuid) -> Result<Client, ServiceError> {
        self.store
            .find_client(ctx.organisation_id, client_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Client))
    }

    pub async fn update_client(
        &self,
        ctx: &AuthContext,
        client_id: Uuid,
        req: ClientRequest,
    ) -> Result<Client, ServiceError> {
        let mut client = self.get_client(ctx, client_id).await?;
        client.first_name = req.first_name;
        client.last_name = req.last_name;
        client.phone_number = req.phone_number;

        if !self.store.update_client(&client).await? {
            return Err(ServiceError::NotFound(Entity::Client));
        }
        Ok(client)
    }

    pub async fn delete_client(&self, ctx: &AuthContext, client_id: Uuid) -> Result<(), ServiceError> {
        self.get_client(ctx, client_id).await?;

        let dependents = self
            .store
            .client_dependents(ctx.organisation_id, client_id)
            .await?;
        if !dependents.is_empty() {
            return Err(ServiceError::Conflict(ConflictKind::ClientHasDependents));
        }

        if !self.store.delete_client(ctx.organisation_id, client_id).await? {
            return Err(ServiceError::NotFound(Entity::Client));
        }
        tracing::info!(client_id = %client_id, "Client deleted");
        Ok(())
    }

    // Cars

    pub async fn create_car(&self, ctx: &AuthContext, req: CarRequest) -> Result<Car, ServiceError> {
        self.get_client(ctx, req.client_id).await?;

        if self.store.vin_exists(&req.vin, None).await? {
            return Err(ServiceError::Conflict(ConflictKind::VinExists));
        }

        let car = req.into_car(ctx.organisation_id, None);
        self.store.insert_car(&car).await?;
        tracing::info!(car_id = %car.car_id, client_id = %car.client_id, "Car created");
        Ok(car)
    }

    pub async fn list_cars(
        &self,
        ctx: &AuthContext,
        filter: &CarFilter,
    ) -> Result<Vec<Car>, ServiceError> {
        self.store.list_cars(ctx.organisation_id, filter).await
    }

    pub async fn get_car(&self, ctx: &AuthContext, car_id: Uuid) -> Result<Car, ServiceError> {
        self.store
            .find_car(ctx.organisation_id, car_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Car))
    }

    pub async fn update_car(
        &self,
        ctx: &AuthContext,
        car_id: Uuid,
        req: CarRequest,
    ) -> Result<Car, ServiceError> {
        let existing = self.get_car(ctx, car_id).await?;
        self.get_client(ctx, req.client_id).await?;

        if self.store.vin_exists(&req.vin, Some(car_id)).await? {
            return Err(ServiceError::Conflict(ConflictKind::VinExists));
        }

        let car = req.into_car(ctx.organisation_id, Some(&existing));
        if !self.store.update_car(&car).await? {
            return Err(ServiceError::NotFound(Entity::Car));
        }
        Ok(car)
    }

    pub async fn delete_car(&self, ctx: &AuthContext, car_id: Uuid) -> Result<(), ServiceError> {
        self.get_car(ctx, car_id).await?;

        if self
            .store
            .count_bills_for_car(ctx.organisation_id, car_id)
            .await?
            > 0
        {
            return Err(ServiceError::Conflict(ConflictKind::CarHasBills));
        }

        if !self.store.delete_car(ctx.organisation_id, car_id).await? {
            return Err(ServiceError::NotFound(Entity::Car));
        }
        tracing::info!(car_id = %car_id, "Car deleted");
        Ok(())
    }

    // Service catalog

    pub async fn create_service(
        &self,
        ctx: &AuthContext,
        req: ServiceRequest,
    ) -> Result<Service, ServiceError> {
        let name = req.name.trim().to_string();

        if self
            .store
            .service_name_exists(ctx.organisation_id, &name, None)
            .await?
        {
            return Err(ServiceError::Conflict(ConflictKind::ServiceNameExists));
        }

        let service = Service::new(ctx.organisation_id, name);
        self.store.insert_service(&service).await?;
        tracing::info!(service_id = %service.service_id, "Service created");
        Ok(service)
    }

    pub async fn list_services(&self, ctx: &AuthContext) -> Result<Vec<Service>, ServiceError> {
        self.store.list_services(ctx.organisation_id).await
    }

    pub async fn get_service(
        &self,
        ctx: &AuthContext,
        service_id: Uuid,
    ) -> Result<Service, ServiceError> {
        self.store
            .find_service(ctx.organisation_id, service_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Service))
    }

    /// Renames a catalog entry. Bills already issued keep the old name.
    pub async fn update_service(
        &self,
        ctx: &AuthContext,
        service_id: Uuid,
        req: ServiceRequest,
    ) -> Result<Service, ServiceError> {
        let mut service = self.get_service(ctx, service_id).await?;
        let name = req.name.trim().to_string();

        if self
            .store
            .service_name_exists(ctx.organisation_id, &name, Some(service_id))
            .await?
        {
            return Err(ServiceError::Conflict(ConflictKind::ServiceNameExists));
        }

        service.name = name;
        if !self.store.update_service(&service).await? {
            return Err(ServiceError::NotFound(Entity::Service));
        }
        Ok(service)
    }

    pub async fn delete_service(
        &self,
        ctx: &AuthContext,
        service_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.get_service(ctx, service_id).await?;

        if self
            .store
            .count_line_items_for_service(ctx.organisation_id, service_id)
            .await?
            > 0
        {
            return Err(ServiceError::Conflict(ConflictKind::ServiceInUse));
        }

        if !self
            .store
            .delete_service(ctx.organisation_id, service_id)
            .await?
        {
            return Err(ServiceError::NotFound(Entity::Service));
        }
        tracing::info!(service_id = %service_id, "Service deleted");
        Ok(())
    }
}
