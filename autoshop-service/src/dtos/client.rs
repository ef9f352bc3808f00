use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Client, ClientFilter};
use crate::utils::validation::validate_phone;

/// Body for both creating and updating a client.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: String,

    #[validate(
        length(min = 1, max = 20, message = "Phone number must be 1-20 characters"),
        custom(function = "validate_phone", message = "Invalid phone number")
    )]
    pub phone_number: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            id: client.client_id,
            first_name: client.first_name,
            last_name: client.last_name,
            phone_number: client.phone_number,
            created_at: client.created_utc,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientQuery {
    pub name: Option<String>,
    pub phone_number: Option<String>,
}

impl From<ClientQuery> for ClientFilter {
    fn from(query: ClientQuery) -> Self {
        Self {
            name: query.name.filter(|s| !s.is_empty()),
            phone_number: query.phone_number.filter(|s| !s.is_empty()),
        }
    }
}
