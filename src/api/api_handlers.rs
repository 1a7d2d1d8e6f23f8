use actix_web::{web, HttpResponse, Responder};
use serde_json::Value;
use tracing::{debug, error};

use crate::api::api_objects::{ErrorResponse, PredictResponse, NO_TEXT_PROVIDED};
use crate::news_prediction::news_prediction::PredictionModel;

pub async fn handle_predict(body: web::Json<Value>, model: web::Data<PredictionModel>) -> impl Responder {
    // Only `text` is read; any other field is ignored
    let Some(text) = body.get("text") else {
        debug!("Prediction request without text");
        return HttpResponse::BadRequest().json(ErrorResponse::new(NO_TEXT_PROVIDED));
    };

    match model.predict(text) {
        Ok(prediction) => HttpResponse::Ok().json(PredictResponse { prediction }),
        Err(e) => {
            error!(error = %e, "Prediction failed");
            HttpResponse::InternalServerError().json(ErrorResponse::new(e.to_string()))
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // No size limit on the body: long texts go straight to the transform
    cfg.service(
        web::resource("/predict")
            .app_data(web::JsonConfig::default().limit(usize::MAX))
            .route(web::post().to(handle_predict)),
    );
}
