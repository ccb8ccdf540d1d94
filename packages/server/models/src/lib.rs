#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crime risk prediction service.
//!
//! Field names are the wire contract the browser frontend already speaks
//! (`dia`, `bairro`, `probabilidade_crime`, ...), so they are spelled out
//! with `rename` rather than derived from the Rust names.

use crime_risk_crime_models::NeighborhoodRecord;
use serde::{Deserialize, Serialize};

/// Body of `POST /predict`.
///
/// Every field is optional at the type level so that missing, `null` and
/// empty values all reach validation and are reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Date, `YYYY-MM-DD`.
    #[serde(rename = "dia", default)]
    pub date: Option<String>,
    /// Time of day, `HH:MM`; missing means midnight.
    #[serde(rename = "hora", default)]
    pub time: Option<String>,
    /// City name.
    #[serde(rename = "cidade", default)]
    pub city: Option<String>,
    /// Neighborhood name.
    #[serde(rename = "bairro", default)]
    pub neighborhood: Option<String>,
    /// Crime type label.
    #[serde(rename = "tipo_crime", default)]
    pub crime_type: Option<String>,
}

/// Response of `POST /predict`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Probability of an occurrence, as a percentage in `[0, 100]` rounded
    /// to two decimals.
    #[serde(rename = "probabilidade_crime")]
    pub probability: f64,
}

/// Response of `GET /metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataResponse {
    /// Known neighborhoods with their city, in code order.
    #[serde(rename = "bairros")]
    pub neighborhoods: Vec<NeighborhoodRecord>,
    /// Known cities, in code order.
    #[serde(rename = "cidades")]
    pub cities: Vec<String>,
    /// Known crime types, in code order.
    #[serde(rename = "tipos_crime")]
    pub crime_types: Vec<String>,
}

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Format version of the loaded bundle.
    pub bundle_version: u32,
    /// Fingerprint of the loaded encoding maps.
    pub fingerprint: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Summary of what went wrong.
    pub error: String,
    /// One message per offending field, when applicable.
    #[serde(default)]
    pub details: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_tolerates_missing_and_null_fields() {
        let request: PredictRequest =
            serde_json::from_str(r#"{ "dia": "2024-10-23", "hora": null, "bairro": "" }"#)
                .unwrap();
        assert_eq!(request.date.as_deref(), Some("2024-10-23"));
        assert_eq!(request.time, None);
        assert_eq!(request.neighborhood.as_deref(), Some(""));
        assert_eq!(request.city, None);
    }

    #[test]
    fn response_uses_wire_name() {
        let json = serde_json::to_value(PredictResponse { probability: 73.0 }).unwrap();
        assert_eq!(json, serde_json::json!({ "probabilidade_crime": 73.0 }));
    }

    #[test]
    fn metadata_uses_wire_names() {
        let json = serde_json::to_value(MetadataResponse {
            neighborhoods: vec![NeighborhoodRecord {
                name: "Centro".to_string(),
                city: "Fortaleza".to_string(),
                latitude: None,
                longitude: None,
            }],
            cities: vec!["Fortaleza".to_string()],
            crime_types: vec!["Furto".to_string()],
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "bairros": [{ "bairro": "Centro", "cidade": "Fortaleza" }],
                "cidades": ["Fortaleza"],
                "tipos_crime": ["Furto"],
            })
        );
    }
}
