//! Car model - a vehicle owned by a client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Car {
    pub car_id: Uuid,
    pub organisation_id: Uuid,
    pub client_id: Uuid,
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
    pub created_utc: DateTime<Utc>,
}

impl Car {
    /// "make model", the string bill searches by car type run against.
    pub fn car_type(&self) -> String {
        format!("{} {}", self.make, self.model)
    }
}

/// Filter parameters for listing cars. Matching is case-sensitive substring.
#[derive(Debug, Clone, Default)]
pub struct CarFilter {
    pub vin: Option<String>,
    pub license_plate: Option<String>,
}

impl CarFilter {
    pub fn matches(&self, car: &Car) -> bool {
        if let Some(vin) = self.vin.as_deref() {
            if !car.vin.contains(vin) {
                return false;
            }
        }

        if let Some(plate) = self.license_plate.as_deref() {
            match car.license_plate.as_deref() {
                Some(p) if p.contains(plate) => {}
                _ => return false,
            }
        }

        true
    }
}
