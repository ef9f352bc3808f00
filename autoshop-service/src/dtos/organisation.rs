use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Organisation;
use crate::utils::validation::validate_not_blank;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisationResponse {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub subscription_start_date: DateTime<Utc>,
    pub subscription_due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Organisation> for OrganisationResponse {
    fn from(org: Organisation) -> Self {
        Self {
            id: org.organisation_id,
            name: org.name,
            location: org.location,
            subscription_start_date: org.subscription_start_utc,
            subscription_due_date: org.subscription_due_utc,
            created_at: org.created_utc,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrganisationRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "validate_not_blank", message = "Name is required")
    )]
    pub name: String,

    #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
    pub location: Option<String>,
}
