use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::measurement::IngestionPipeline;
use crate::solar::{SpaOracle, SunOracle};
use crate::storage::{MeasurementStore, MemoryStore, PostgresStore, VerdictStore};
use crate::verdict::VerdictService;

use super::api::{measurements as measurement_handlers, solar as solar_handlers, verdict as verdict_handlers};
use super::api_doc::ApiDoc;
use super::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub oracle: Arc<dyn SunOracle>,
    pub pipeline: Arc<IngestionPipeline>,
    pub measurements: Arc<dyn MeasurementStore>,
    pub verdicts: Arc<VerdictService>,
}

pub async fn run_server(config: Config) -> io::Result<()> {
    let bind_addr = config.web.bind.clone();

    let (measurements, verdict_store): (Arc<dyn MeasurementStore>, Arc<dyn VerdictStore>) =
        match &config.database {
            Some(db) => {
                let store = Arc::new(PostgresStore::connect(&db.url).map_err(io::Error::other)?);
                (store.clone(), store)
            }
            None => {
                log::warn!("no database configured, falling back to in-memory storage");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    let oracle: Arc<dyn SunOracle> = Arc::new(SpaOracle);
    let pipeline = Arc::new(IngestionPipeline::new(
        measurements.clone(),
        oracle.clone(),
        config.rate_limit.policy(),
        config.validation.future_tolerance,
    ));
    let verdicts = Arc::new(VerdictService::new(
        measurements.clone(),
        verdict_store,
        config.verdict.policy(),
    ));

    let state = AppState {
        oracle,
        pipeline,
        measurements,
        verdicts,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/solar/calculate", post(solar_handlers::calculate))
        .route("/api/solar/measure", post(solar_handlers::measure))
        .route(
            "/api/solar/measurements",
            get(measurement_handlers::list),
        )
        .route("/api/solar/stats", get(measurement_handlers::stats))
        .route("/api/solar/export", get(measurement_handlers::export))
        .route("/api/verdict/latest", get(verdict_handlers::latest))
        .route("/api/verdict/trigger", post(verdict_handlers::trigger))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
