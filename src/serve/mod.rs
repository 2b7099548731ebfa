//! HTTP prediction endpoint
//!
//! Exposes the fitted price model over two routes: `POST /predict` for
//! price estimates and `GET /healthz` for liveness probes. The model is
//! loaded once at startup and shared read-only across workers.

use crate::pricing::PriceModel;
use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Body of `POST /predict`.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub area_sqft: f64,
    pub bedrooms: u32,
    pub locality: String,
    /// Construction status, e.g. "Ready to Move"; accepted for contract
    /// compatibility, not consulted by the median model
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of the `POST /predict` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_price_lakhs: f64,
}

#[post("/predict")]
async fn predict(
    model: web::Data<PriceModel>,
    body: web::Json<PredictRequest>,
) -> impl Responder {
    debug!(area_sqft = body.area_sqft, locality = %body.locality, "prediction request");
    let price = model.predict(body.area_sqft, &body.locality);
    HttpResponse::Ok().json(PredictResponse {
        predicted_price_lakhs: round_to_cents(price),
    })
}

#[get("/healthz")]
async fn healthz() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Serves the prediction endpoint until the process is stopped.
///
/// # Arguments
///
/// * `bind_addr` - Address to listen on, e.g. "127.0.0.1:8080"
/// * `model` - The fitted model answering predictions
pub async fn run(bind_addr: &str, model: PriceModel) -> std::io::Result<()> {
    let data = web::Data::new(model);
    info!(addr = bind_addr, "prediction endpoint listening");

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .service(predict)
            .service(healthz)
    })
    .bind(bind_addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn sample_model() -> PriceModel {
        PriceModel {
            locality_median_ppsf: BTreeMap::from([("Vyttila".to_string(), 5432.1)]),
            global_median_ppsf: 5000.0,
            train_rows: 1,
            validation_rows: 0,
            validation_mae_lakhs: None,
            validation_r2: None,
            trained_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn test_healthz_responds_ok() {
        let app = test::init_service(App::new().service(healthz)).await;
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/healthz").to_request(),
        )
        .await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_predict_rounds_to_two_decimals() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(sample_model()))
                .service(predict),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!({
                "area_sqft": 1000.0,
                "bedrooms": 2,
                "locality": "Vyttila",
                "status": "Ready to Move"
            }))
            .to_request();
        let body: PredictResponse = test::call_and_read_body_json(&app, req).await;

        // 5432.1 ppsf over 1000 sqft is 54.321 lakhs
        assert_eq!(body.predicted_price_lakhs, 54.32);
    }

    #[actix_web::test]
    async fn test_predict_falls_back_for_unknown_locality() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(sample_model()))
                .service(predict),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!({
                "area_sqft": 1000.0,
                "bedrooms": 3,
                "locality": "Elsewhere"
            }))
            .to_request();
        let body: PredictResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.predicted_price_lakhs, 50.0);
    }
}
