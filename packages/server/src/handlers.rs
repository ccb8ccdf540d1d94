//! HTTP handler functions for the prediction API.

use actix_web::{HttpRequest, HttpResponse, error, web};
use crime_risk_server_models::{ApiError, ApiHealth, PredictRequest, PredictResponse};

use crate::AppState;
use crate::service::ServiceError;

/// `GET /health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        bundle_version: state.service.bundle_version(),
        fingerprint: state.service.fingerprint().to_string(),
    })
}

/// `POST /predict`
///
/// Scores one raw context and returns the probability percentage.
pub async fn predict(
    state: web::Data<AppState>,
    body: web::Json<PredictRequest>,
) -> HttpResponse {
    match state.service.predict(&body) {
        Ok(probability) => HttpResponse::Ok().json(PredictResponse { probability }),
        Err(e) => error_response(&e),
    }
}

/// `GET /metadata`
///
/// Lists the neighborhoods, cities and crime types the model knows.
pub async fn metadata(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.service.metadata())
}

fn error_response(e: &ServiceError) -> HttpResponse {
    let body = ApiError {
        error: e.summary().to_string(),
        details: e.details(),
    };
    if e.is_client_error() {
        log::debug!("Rejected prediction request: {e}");
        HttpResponse::BadRequest().json(body)
    } else {
        log::error!("Prediction failed: {e}");
        HttpResponse::InternalServerError().json(body)
    }
}

/// JSON extractor settings: any content type is accepted and a body that
/// does not parse gets the standard error shape with status 400.
#[must_use]
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .content_type_required(false)
        .error_handler(|err, _req: &HttpRequest| {
            let body = ApiError {
                error: "malformed JSON body".to_string(),
                details: vec![err.to_string()],
            };
            error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use crime_risk_server_models::MetadataResponse;

    use super::*;
    use crate::service::tests::{FixedModel, service_with};

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState {
            service: service_with(Arc::new(FixedModel)),
        })
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(state())
                    .app_data(json_config())
                    .configure(crate::routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn predict_returns_percentage() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!({
                "dia": "2024-10-23",
                "hora": "14:00",
                "cidade": "Fortaleza",
                "bairro": "Centro",
                "tipo_crime": "Furto"
            }))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp, serde_json::json!({ "probabilidade_crime": 73.0 }));
    }

    #[actix_web::test]
    async fn missing_date_is_bad_request() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!({
                "hora": "14:00",
                "cidade": "Fortaleza",
                "bairro": "Centro",
                "tipo_crime": "Furto"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "missing required fields");
        assert_eq!(body.details, ["dia is required"]);
    }

    #[actix_web::test]
    async fn unknown_neighborhood_is_bad_request() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!({
                "dia": "2024-10-23",
                "hora": "14:00",
                "cidade": "Fortaleza",
                "bairro": "Unknown District",
                "tipo_crime": "Furto"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "unknown category");
        assert_eq!(
            body.details,
            ["bairro 'Unknown District' not found in mapping"]
        );
    }

    #[actix_web::test]
    async fn malformed_json_is_bad_request() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict")
            .insert_header(("content-type", "text/plain"))
            .set_payload("{ not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "malformed JSON body");
    }

    #[actix_web::test]
    async fn metadata_lists_known_labels() {
        let app = app!();
        let req = test::TestRequest::get().uri("/metadata").to_request();
        let resp: MetadataResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.cities, ["Fortaleza"]);
        assert_eq!(resp.crime_types, ["Furto"]);
        assert_eq!(resp.neighborhoods.len(), 1);
    }

    #[actix_web::test]
    async fn health_reports_bundle() {
        let app = app!();
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp: ApiHealth = test::call_and_read_body_json(&app, req).await;
        assert!(resp.healthy);
        assert_eq!(resp.bundle_version, 1);
        assert_eq!(resp.fingerprint, "test-fingerprint");
    }
}
