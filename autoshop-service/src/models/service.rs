//! Service model - an entry in the organisation's catalog of work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub service_id: Uuid,
    pub organisation_id: Uuid,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

impl Service {
    pub fn new(organisation_id: Uuid, name: String) -> Self {
        Self {
            service_id: Uuid::new_v4(),
            organisation_id,
            name,
            created_utc: Utc::now(),
        }
    }
}
