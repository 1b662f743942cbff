//! Medication registry adapter
//!
//! Read-only client for the government medication registry (Kemenkes).
//! Responses are mapped to a small local shape; the service proxies
//! searches and seeds catalog entries from registry data.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;

/// One registry medication record
///
/// Accepts the registry's snake_case payloads and serializes camelCase
/// towards our own clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    #[serde(alias = "generic_name", default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryResponse {
    #[serde(default)]
    data: Vec<Medication>,
}

/// Medication registry client
#[derive(Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RegistryClient {
    /// Create a new registry client from configuration
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetch medications, optionally filtered by a search term
    pub async fn get_medications(
        &self,
        search: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Medication>> {
        let mut request = self
            .client
            .get(format!("{}/medications", self.base_url))
            .query(&[("limit", limit.to_string())]);

        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            request = request.query(&[("search", search)]);
        }

        if let Some(ref api_key) = self.api_key {
            request = request.header("x-api-key", api_key);
        }

        let response: RegistryResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medication_accepts_snake_case_payload() {
        let json = r#"{
            "name": "Paracetamol 500mg",
            "generic_name": "Paracetamol",
            "manufacturer": "Kimia Farma"
        }"#;

        let medication: Medication = serde_json::from_str(json).unwrap();
        assert_eq!(medication.name, "Paracetamol 500mg");
        assert_eq!(medication.generic_name.as_deref(), Some("Paracetamol"));
        assert!(medication.category.is_none());
    }

    #[test]
    fn test_medication_serializes_camel_case() {
        let medication = Medication {
            name: "Paracetamol 500mg".to_string(),
            generic_name: Some("Paracetamol".to_string()),
            manufacturer: None,
            category: None,
            description: None,
        };

        let json = serde_json::to_value(&medication).unwrap();
        assert!(json.get("genericName").is_some());
        assert!(json.get("generic_name").is_none());
    }

    #[test]
    fn test_registry_response_tolerates_missing_data() {
        let response: RegistryResponse = serde_json::from_str("{}").unwrap();
        assert!(response.data.is_empty());
    }
}
