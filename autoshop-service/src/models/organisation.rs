//! Organisation model - one tenant (an auto-repair shop).

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Organisation {
    pub organisation_id: Uuid,
    pub name: String,
    pub location: String,
    pub subscription_start_utc: DateTime<Utc>,
    pub subscription_due_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl Organisation {
    /// A freshly registered organisation: empty location, one-year subscription.
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        let due = now
            .checked_add_months(Months::new(12))
            .unwrap_or_else(|| now + Duration::days(365));

        Self {
            organisation_id: Uuid::new_v4(),
            name,
            location: String::new(),
            subscription_start_utc: now,
            subscription_due_utc: due,
            created_utc: now,
        }
    }
}
