//! Client model - a customer of the shop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub organisation_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub created_utc: DateTime<Utc>,
}

impl Client {
    pub fn new(
        organisation_id: Uuid,
        first_name: String,
        last_name: String,
        phone_number: String,
    ) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            organisation_id,
            first_name,
            last_name,
            phone_number,
            created_utc: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Filter parameters for listing clients. Matching is case-sensitive substring.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    /// Matches "first last", first name or last name.
    pub name: Option<String>,
    pub phone_number: Option<String>,
}

impl ClientFilter {
    pub fn matches(&self, client: &Client) -> bool {
        if let Some(name) = self.name.as_deref() {
            if !(client.full_name().contains(name)
                || client.first_name.contains(name)
                || client.last_name.contains(name))
            {
                return false;
            }
        }

        if let Some(phone) = self.phone_number.as_deref() {
            if !client.phone_number.contains(phone) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> Client {
        Client::new(
            Uuid::new_v4(),
            "Jane".into(),
            "Doe".into(),
            "+1 555 0100".into(),
        )
    }

    #[test]
    fn test_name_filter_matches_full_and_parts() {
        let client = jane();
        for needle in ["Jane Doe", "e D", "Jane", "Doe"] {
            let filter = ClientFilter {
                name: Some(needle.to_string()),
                ..Default::default()
            };
            assert!(filter.matches(&client), "expected match for {needle}");
        }

        let filter = ClientFilter {
            name: Some("jane".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&client));
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let filter = ClientFilter {
            name: Some("Jane".into()),
            phone_number: Some("0199".into()),
        };
        assert!(!filter.matches(&jane()));
    }
}
