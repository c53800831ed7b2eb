use axum::{routing::get, routing::post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::refresh::{RefreshWorker, Refresher, SharedEngine};

use super::api::orbit as orbit_handlers;
use super::api::predict as predict_handlers;
use super::api_doc::ApiDoc;
use super::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/predict", post(predict_handlers::predict))
        .route("/api/path", post(predict_handlers::path))
        .route("/api/orbit", get(orbit_handlers::status))
        .route("/api/calibration", post(orbit_handlers::calibrate))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config, engine: SharedEngine) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let mut worker = RefreshWorker::start(engine.clone(), Refresher::from_config(&config));

    let app = router(AppState { engine });

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let result = axum::serve(listener, app).await;
    worker.stop().await;
    result
}
