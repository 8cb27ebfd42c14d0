//! HTTP client for the reverse-geocoding API.

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use super::{Geocoder, PlaceInfo};

pub struct PlacesClient {
    endpoint: String,
    agent: ureq::Agent,
}

impl PlacesClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .build();

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            agent,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlaceResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    keywords: Vec<String>,
}

impl Geocoder for PlacesClient {
    fn lookup(&self, lat: f64, lng: f64) -> Result<PlaceInfo> {
        let url = format!("{}?lat={lat}&lng={lng}", self.endpoint);
        let response: PlaceResponse = self.agent.get(&url).call()?.into_json()?;

        Ok(PlaceInfo {
            id: response.id,
            name: response.name,
            city: response.city,
            state: response.state,
            country_code: response.country_code.to_lowercase(),
            country_name: response.country,
            category: response.category,
            keywords: response.keywords,
        })
    }
}
