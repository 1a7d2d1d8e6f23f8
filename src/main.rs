use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing::info;

use fake_news_api::api::api_handlers::configure_routes;
use fake_news_api::news_prediction::news_prediction::PredictionModel;
use fake_news_api::utils::{init_tracing, load_config};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let server_config = load_config().server;

    // Both artifacts must load before the socket is bound
    let model = PredictionModel::load(&server_config.vectorizer_path, &server_config.classifier_path)
        .context("Failed to load prediction artifacts")?;
    let model = web::Data::new(model);

    let server = HttpServer::new(move || App::new().app_data(model.clone()).configure(configure_routes))
        .bind((server_config.host.as_str(), server_config.port))
        .with_context(|| format!("Failed to bind {}:{}", server_config.host, server_config.port))?;
    info!(host = %server_config.host, port = server_config.port, "Prediction service started");

    server.run().await?;
    Ok(())
}
