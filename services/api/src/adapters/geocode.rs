//! services/api/src/adapters/geocode.rs
//!
//! This module contains the reverse-geocoding adapter backed by a
//! Nominatim-compatible HTTP endpoint. It implements the `ReverseGeocoder`
//! port from the core crate.

use async_trait::async_trait;
use incident_core::ports::{PortError, PortResult, ReverseGeocoder};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("incident-reporter/", env!("CARGO_PKG_VERSION"));

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ReverseGeocoder` port using Nominatim.
#[derive(Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// Creates a new `NominatimGeocoder`. The request timeout is a transport
    /// limit; the core applies its own deadline on top.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> PortResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Debug, Default, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    #[serde(default)]
    address: AddressParts,
}

#[derive(Debug, Default, Deserialize)]
struct AddressParts {
    house_number: Option<String>,
    road: Option<String>,
    neighbourhood: Option<String>,
    suburb: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

/// Builds a compact postal address, falling back to `display_name` when the
/// structured parts are empty.
fn format_address(response: ReverseResponse) -> Option<String> {
    let a = response.address;
    let street = match (a.house_number, a.road) {
        (Some(number), Some(road)) => Some(format!("{number} {road}")),
        (None, Some(road)) => Some(road),
        _ => None,
    };
    let locality = a.city.or(a.town).or(a.village);
    let parts: Vec<String> = [
        street,
        a.neighbourhood.or(a.suburb),
        locality,
        a.state,
        a.postcode,
        a.country,
    ]
    .into_iter()
    .flatten()
    .map(|p| p.trim().to_string())
    .filter(|p| !p.is_empty())
    .collect();

    if parts.is_empty() {
        response
            .display_name
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
    } else {
        Some(parts.join(", "))
    }
}

//=========================================================================================
// `ReverseGeocoder` Trait Implementation
//=========================================================================================

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> PortResult<String> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .header(reqwest::header::ACCEPT_LANGUAGE, "en")
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("geocoder request failed: {e}")))?
            .error_for_status()
            .map_err(|e| PortError::Unexpected(format!("geocoder returned an error: {e}")))?;

        let body: ReverseResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("geocoder response unreadable: {e}")))?;

        format_address(body)
            .ok_or_else(|| PortError::NotFound(format!("no address for {lat}, {lng}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ReverseResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn joins_structured_parts_in_postal_order() {
        let response = parse(
            r#"{
                "display_name": "ignored",
                "address": {
                    "house_number": "12",
                    "road": "Ring Road",
                    "suburb": "Lajpat Nagar",
                    "city": "New Delhi",
                    "state": "Delhi",
                    "postcode": "110024",
                    "country": "India"
                }
            }"#,
        );
        assert_eq!(
            format_address(response).unwrap(),
            "12 Ring Road, Lajpat Nagar, New Delhi, Delhi, 110024, India"
        );
    }

    #[test]
    fn falls_back_to_town_and_display_name() {
        let town = parse(r#"{"address": {"road": "High St", "town": "Rye"}}"#);
        assert_eq!(format_address(town).unwrap(), "High St, Rye");

        let bare = parse(r#"{"display_name": "Somewhere at sea"}"#);
        assert_eq!(format_address(bare).unwrap(), "Somewhere at sea");

        assert!(format_address(parse(r#"{"error": "Unable to geocode"}"#)).is_none());
    }
}
