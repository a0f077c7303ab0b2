use crate::config::Config;
use crate::errors::AppError;
use crate::models::{Card, Place};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Client for the wallet collaborator, which owns card persistence.
///
/// This service never stores cards itself; it only reads the user's wallet
/// over HTTP and filters out inactive instruments.
pub struct WalletService {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl WalletService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create wallet client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.wallet_base_url.clone(),
            api_token: config.wallet_api_token.clone(),
        })
    }

    /// Fetches the user's active cards from the wallet service.
    pub async fn fetch_cards(&self, user_id: &str) -> Result<Vec<Card>, AppError> {
        let url = format!("{}/api/v1/users/{}/cards", self.base_url, user_id);
        tracing::info!("Fetching wallet for user {}", user_id);

        let mut request = self.client.get(&url);
        if let Some(ref token) = self.api_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| {
            AppError::ExternalApiError(format!("Wallet service request failed: {}", e))
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Wallet service returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Wallet service returned status {}: {}",
                status, error_text
            )));
        }

        let cards: Vec<Card> = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse wallet response: {}", e))
        })?;

        let active: Vec<Card> = cards.into_iter().filter(|c| c.is_active).collect();
        tracing::info!("Fetched {} active card(s) for user {}", active.len(), user_id);

        Ok(active)
    }
}

// ============ Location lookup (OpenStreetMap Overpass) ============

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Distance between two coordinates in meters (haversine).
fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Extracts the most specific raw category label from OSM tags.
///
/// The label stays raw here (e.g. "fast_food", "supermarket", "fuel");
/// normalization onto the canonical categories is the engine's job.
fn raw_category_from_tags(tags: &HashMap<String, String>) -> String {
    for key in ["amenity", "shop", "tourism", "leisure", "aeroway"] {
        if let Some(value) = tags.get(key) {
            return value.clone();
        }
    }
    String::new()
}

fn address_from_tags(tags: &HashMap<String, String>) -> String {
    let mut parts = Vec::new();
    for key in ["addr:housenumber", "addr:street", "addr:city", "addr:postcode"] {
        if let Some(value) = tags.get(key) {
            parts.push(value.as_str());
        }
    }
    parts.join(", ")
}

/// Client for the nearby-place collaborator (OpenStreetMap Overpass API).
pub struct LocationService {
    client: Client,
    overpass_url: String,
}

impl LocationService {
    /// Maximum number of places returned per lookup, closest first.
    const MAX_PLACES: usize = 20;

    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create location client: {}", e))
            })?;

        Ok(Self {
            client,
            overpass_url: config.overpass_url.clone(),
        })
    }

    /// Builds the Overpass QL query for reward-relevant merchants around a
    /// coordinate.
    fn build_query(latitude: f64, longitude: f64, radius: u32) -> String {
        let around = format!("around:{},{},{}", radius, latitude, longitude);
        let selectors = [
            // Dining
            r#"node["amenity"="restaurant"]"#,
            r#"node["amenity"="cafe"]"#,
            r#"node["amenity"="fast_food"]"#,
            r#"node["amenity"="bar"]"#,
            // Groceries
            r#"node["shop"="supermarket"]"#,
            r#"node["shop"="grocery"]"#,
            r#"node["shop"="convenience"]"#,
            // Gas
            r#"node["amenity"="fuel"]"#,
            // Shopping
            r#"node["shop"="mall"]"#,
            r#"node["shop"="department_store"]"#,
            r#"node["shop"="clothes"]"#,
            r#"node["shop"="electronics"]"#,
            // Entertainment
            r#"node["amenity"="cinema"]"#,
            r#"node["leisure"="bowling_alley"]"#,
            // Travel
            r#"node["tourism"="hotel"]"#,
            r#"node["aeroway"="aerodrome"]"#,
        ];

        let mut query = String::from("[out:json][timeout:25];\n(\n");
        for selector in selectors {
            query.push_str(&format!("  {}({});\n", selector, around));
        }
        query.push_str(");\nout body;");
        query
    }

    /// Finds nearby reward-relevant places, sorted ascending by distance and
    /// capped at 20 results.
    pub async fn nearby_places(
        &self,
        latitude: f64,
        longitude: f64,
        radius: u32,
    ) -> Result<Vec<Place>, AppError> {
        let query = Self::build_query(latitude, longitude, radius);
        tracing::info!(
            "Querying Overpass for places around ({}, {}) radius {}m",
            latitude,
            longitude,
            radius
        );

        let response = self
            .client
            .post(&self.overpass_url)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Overpass request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Overpass API returned error status {}", status);
            return Err(AppError::ExternalApiError(format!(
                "Overpass API returned status {}",
                status
            )));
        }

        let body: OverpassResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Overpass response: {}", e))
        })?;

        let mut places: Vec<Place> = Vec::new();
        for element in body.elements {
            if element.element_type != "node" {
                continue;
            }
            let (Some(lat), Some(lon)) = (element.lat, element.lon) else {
                continue;
            };

            let name = element
                .tags
                .get("name")
                .or_else(|| element.tags.get("brand"))
                .cloned()
                .unwrap_or_else(|| "Unknown Place".to_string());

            places.push(Place {
                place_id: format!("osm_{}", element.id),
                name,
                raw_category: raw_category_from_tags(&element.tags),
                address: address_from_tags(&element.tags),
                latitude: lat,
                longitude: lon,
                rating: None,
                distance_meters: haversine_meters(latitude, longitude, lat, lon),
            });
        }

        // Same node can match several selectors
        let mut seen = std::collections::HashSet::new();
        places.retain(|p| seen.insert(p.place_id.clone()));
        places.sort_by(|a, b| {
            a.distance_meters
                .partial_cmp(&b.distance_meters)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        places.truncate(Self::MAX_PLACES);

        tracing::info!("Found {} nearby place(s)", places.len());
        Ok(places)
    }
}
