use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Car, CarFilter};

/// Body for both creating and updating a car.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CarRequest {
    #[validate(length(min = 1, max = 50, message = "Make must be 1-50 characters"))]
    pub make: String,

    #[validate(length(min = 1, max = 50, message = "Model must be 1-50 characters"))]
    pub model: String,

    #[validate(range(min = 1900, max = 2100, message = "Year must be between 1900 and 2100"))]
    pub year: i32,

    #[validate(length(max = 30))]
    pub color: Option<String>,

    #[validate(length(equal = 17, message = "VIN must be exactly 17 characters"))]
    pub vin: String,

    #[validate(length(max = 20))]
    pub license_plate: Option<String>,

    #[validate(length(max = 50))]
    pub insurance_number: Option<String>,

    #[validate(range(min = 0, max = 999_999, message = "Mileage must be between 0 and 999999"))]
    pub mileage: Option<i32>,

    #[validate(length(max = 50))]
    pub engine_type: Option<String>,

    #[validate(length(max = 50))]
    pub transmission: Option<String>,

    #[validate(range(min = 1, max = 10, message = "Number of doors must be between 1 and 10"))]
    pub number_of_doors: Option<i32>,

    pub client_id: Uuid,
}

impl CarRequest {
    /// Builds the car record this request describes, keeping `car_id` and
    /// `created_utc` from `existing` on update.
    pub fn into_car(self, organisation_id: Uuid, existing: Option<&Car>) -> Car {
        Car {
            car_id: existing.map_or_else(Uuid::new_v4, |c| c.car_id),
            organisation_id,
            client_id: self.client_id,
            make: self.make,
            model: self.model,
            year: self.year,
            color: self.color,
            vin: self.vin,
            license_plate: self.license_plate,
            insurance_number: self.insurance_number,
            mileage: self.mileage,
            engine_type: self.engine_type,
            transmission: self.transmission,
            number_of_doors: self.number_of_doors,
            created_utc: existing.map_or_else(Utc::now, |c| c.created_utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarResponse {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: Option<String>,
    pub vin: String,
    pub license_plate: Option<String>,
    pub insurance_number: Option<String>,
    pub mileage: Option<i32>,
    pub engine_type: Option<String>,
    pub transmission: Option<String>,
    pub number_of_doors: Option<i32>,
    pub client_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Car> for CarResponse {
    fn from(car: Car) -> Self {
        Self {
            id: car.car_id,
            make: car.make,
            model: car.model,
            year: car.year,
            color: car.color,
            vin: car.vin,
            license_plate: car.license_plate,
            insurance_number: car.insurance_number,
            mileage: car.mileage,
            engine_type: car.engine_type,
            transmission: car.transmission,
            number_of_doors: car.number_of_doors,
            client_id: car.client_id,
            created_at: car.created_utc,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarQuery {
    pub vin: Option<String>,
    pub license_plate: Option<String>,
}

impl From<CarQuery> for CarFilter {
    fn from(query: CarQuery) -> Self {
        Self {
            vin: query.vin.filter(|s| !s.is_empty()),
            license_plate: query.license_plate.filter(|s| !s.is_empty()),
        }
    }
}
