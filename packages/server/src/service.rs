//! Transport-free prediction core.
//!
//! Turns a raw request into a [`Context`] with the persisted encoding maps
//! and asks the model for a probability. The HTTP layer only maps
//! [`ServiceError`] variants to status codes.

use std::sync::Arc;

use crime_risk_crime_models::{Context, NeighborhoodRecord};
use crime_risk_features::{CategoryEncoders, CategoryLabels, ParseError, UnknownCategoryError, temporal};
use crime_risk_model::{ArtifactBundle, RiskModel};
use crime_risk_server_models::{MetadataResponse, PredictRequest};

/// Required request fields that were absent, `null` or empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing required fields: {}", .missing.join(", "))]
pub struct ValidationError {
    /// Wire names of the missing fields, in request order.
    pub missing: Vec<&'static str>,
}

/// Errors that can occur while serving a prediction.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Required fields are missing.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The date or time is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A label is not in the persisted maps.
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategoryError),

    /// The model produced something that is not a probability.
    #[error("model returned an invalid probability: {0}")]
    Model(f64),
}

impl ServiceError {
    /// Whether the caller is at fault (as opposed to the service).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Model(_))
    }

    /// Short summary for the error body.
    #[must_use]
    pub const fn summary(&self) -> &'static str {
        match self {
            Self::Validation(_) => "missing required fields",
            Self::Parse(_) => "invalid date or time",
            Self::UnknownCategory(_) => "unknown category",
            Self::Model(_) => "prediction failed",
        }
    }

    /// One message per offending field.
    #[must_use]
    pub fn details(&self) -> Vec<String> {
        match self {
            Self::Validation(e) => e
                .missing
                .iter()
                .map(|field| format!("{field} is required"))
                .collect(),
            Self::Parse(e) => vec![format!("{}: {e}", e.field())],
            Self::UnknownCategory(e) => e.unknown.iter().map(ToString::to_string).collect(),
            Self::Model(_) => Vec::new(),
        }
    }
}

/// Converts a probability to a percentage in `[0, 100]` with two decimals.
#[must_use]
pub fn to_percentage(probability: f64) -> f64 {
    (probability.clamp(0.0, 1.0) * 100.0 * 100.0).round() / 100.0
}

/// The loaded model, its maps and the metadata it exposes. Immutable.
pub struct PredictionService {
    model: Arc<dyn RiskModel>,
    encoders: CategoryEncoders,
    neighborhoods: Vec<NeighborhoodRecord>,
    bundle_version: u32,
    fingerprint: String,
}

impl PredictionService {
    /// Creates a service from its parts.
    #[must_use]
    pub fn new(
        model: Arc<dyn RiskModel>,
        encoders: CategoryEncoders,
        neighborhoods: Vec<NeighborhoodRecord>,
        bundle_version: u32,
        fingerprint: String,
    ) -> Self {
        Self {
            model,
            encoders,
            neighborhoods,
            bundle_version,
            fingerprint,
        }
    }

    /// Creates a service from a verified bundle.
    #[must_use]
    pub fn from_bundle(bundle: ArtifactBundle) -> Self {
        Self::new(
            Arc::new(bundle.model),
            bundle.encoders,
            bundle.neighborhoods,
            bundle.format_version,
            bundle.fingerprint,
        )
    }

    /// Format version of the loaded bundle.
    #[must_use]
    pub const fn bundle_version(&self) -> u32 {
        self.bundle_version
    }

    /// Fingerprint of the loaded maps.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Encodes a request into a context.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::Validation`] listing every missing required field
    /// * [`ServiceError::Parse`] if the date or time is malformed
    /// * [`ServiceError::UnknownCategory`] listing every unknown label
    pub fn encode(&self, request: &PredictRequest) -> Result<Context, ServiceError> {
        let date = present(request.date.as_deref());
        let city = present(request.city.as_deref());
        let neighborhood = present(request.neighborhood.as_deref());
        let crime_type = present(request.crime_type.as_deref());

        let (Some(date), Some(city), Some(neighborhood), Some(crime_type)) =
            (date, city, neighborhood, crime_type)
        else {
            let missing = [
                ("dia", date),
                ("cidade", city),
                ("bairro", neighborhood),
                ("tipo_crime", crime_type),
            ]
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| field)
            .collect();
            return Err(ValidationError { missing }.into());
        };

        let temporal = temporal::extract(date, request.time.as_deref())?;
        let context = self.encoders.encode_context(
            temporal,
            CategoryLabels {
                neighborhood,
                city,
                crime_type,
            },
        )?;
        Ok(context)
    }

    /// Scores a request, returning a percentage in `[0, 100]`.
    ///
    /// # Errors
    ///
    /// * Any error from [`Self::encode`]
    /// * [`ServiceError::Model`] if the model returns a non-finite value
    pub fn predict(&self, request: &PredictRequest) -> Result<f64, ServiceError> {
        let context = self.encode(request)?;
        let probability = self.model.predict_probability(&context);
        if !probability.is_finite() {
            return Err(ServiceError::Model(probability));
        }
        log::debug!("Scored {context:?}: {probability}");
        Ok(to_percentage(probability))
    }

    /// The known labels, in code order.
    #[must_use]
    pub fn metadata(&self) -> MetadataResponse {
        MetadataResponse {
            neighborhoods: self.neighborhoods.clone(),
            cities: self.encoders.cities.labels().to_vec(),
            crime_types: self.encoders.crime_types.labels().to_vec(),
        }
    }
}

/// A trimmed, non-empty value.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crime_risk_features::EncodingMap;

    /// Returns 0.73 for Wednesday 2024-10-23 14:00 in the only known
    /// neighborhood, 0.0 otherwise.
    pub struct FixedModel;

    pub const SCORED: Context = Context {
        day_of_week: 2,
        hour: 14,
        month: 10,
        year: 2024,
        neighborhood: 0,
        city: 0,
        crime_type: 0,
    };

    impl RiskModel for FixedModel {
        fn predict_probability(&self, context: &Context) -> f64 {
            if *context == SCORED { 0.73 } else { 0.0 }
        }
    }

    struct BrokenModel;

    impl RiskModel for BrokenModel {
        fn predict_probability(&self, _context: &Context) -> f64 {
            f64::NAN
        }
    }

    pub fn service_with(model: Arc<dyn RiskModel>) -> PredictionService {
        PredictionService::new(
            model,
            CategoryEncoders {
                neighborhoods: EncodingMap::from_labels(["Centro"]),
                cities: EncodingMap::from_labels(["Fortaleza"]),
                crime_types: EncodingMap::from_labels(["Furto"]),
            },
            vec![NeighborhoodRecord {
                name: "Centro".to_string(),
                city: "Fortaleza".to_string(),
                latitude: None,
                longitude: None,
            }],
            1,
            "test-fingerprint".to_string(),
        )
    }

    pub fn request() -> PredictRequest {
        PredictRequest {
            date: Some("2024-10-23".to_string()),
            time: Some("14:00".to_string()),
            city: Some("Fortaleza".to_string()),
            neighborhood: Some("Centro".to_string()),
            crime_type: Some("Furto".to_string()),
        }
    }

    #[test]
    fn encodes_the_request_context() {
        let service = service_with(Arc::new(FixedModel));
        assert_eq!(service.encode(&request()).unwrap(), SCORED);
    }

    #[test]
    fn returns_percentage() {
        let service = service_with(Arc::new(FixedModel));
        let p = service.predict(&request()).unwrap();
        assert!((p - 73.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_time_is_midnight() {
        let service = service_with(Arc::new(FixedModel));
        let request = PredictRequest {
            time: None,
            ..request()
        };
        assert_eq!(service.encode(&request).unwrap().hour, 0);
    }

    #[test]
    fn reports_every_missing_field() {
        let service = service_with(Arc::new(FixedModel));
        let request = PredictRequest {
            date: None,
            neighborhood: Some("   ".to_string()),
            ..request()
        };
        let err = service.predict(&request).unwrap_err();
        assert!(err.is_client_error());
        match err {
            ServiceError::Validation(e) => assert_eq!(e.missing, ["dia", "bairro"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_time_is_rejected() {
        let service = service_with(Arc::new(FixedModel));
        let request = PredictRequest {
            time: Some("25:61".to_string()),
            ..request()
        };
        let err = service.predict(&request).unwrap_err();
        assert!(matches!(err, ServiceError::Parse(_)));
        assert_eq!(err.details(), ["hora: invalid time '25:61': expected HH:MM"]);
    }

    #[test]
    fn unknown_neighborhood_is_rejected() {
        let service = service_with(Arc::new(FixedModel));
        let request = PredictRequest {
            neighborhood: Some("Unknown District".to_string()),
            ..request()
        };
        let err = service.predict(&request).unwrap_err();
        assert!(matches!(err, ServiceError::UnknownCategory(_)));
        assert_eq!(
            err.details(),
            ["bairro 'Unknown District' not found in mapping"]
        );
    }

    #[test]
    fn non_finite_probability_is_a_server_error() {
        let service = service_with(Arc::new(BrokenModel));
        let err = service.predict(&request()).unwrap_err();
        assert!(!err.is_client_error());
    }

    #[test]
    fn percentage_is_clamped_and_rounded() {
        assert!((to_percentage(0.123_456) - 12.35).abs() < 1e-9);
        assert!((to_percentage(1.5) - 100.0).abs() < f64::EPSILON);
        assert!(to_percentage(-0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn metadata_lists_labels_in_code_order() {
        let metadata = service_with(Arc::new(FixedModel)).metadata();
        assert_eq!(metadata.cities, ["Fortaleza"]);
        assert_eq!(metadata.crime_types, ["Furto"]);
        assert_eq!(metadata.neighborhoods[0].name, "Centro");
    }
}
