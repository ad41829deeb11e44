use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod spoonacular_client;
mod vision_client;

use config::AppConfig;
use services::{ChartRenderer, NutritionAnalyzer};

// AppState holds the startup configuration and the analysis pipeline wired to both upstream clients
pub struct AppState {
    pub config: AppConfig,
    pub analyzer: NutritionAnalyzer,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            tracing::info!("Set GOOGLE_VISION_API_KEY and SPOONACULAR_API_KEY (e.g. in .env)");
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.static_dir) {
        tracing::warn!("Failed to create static directory: {}", e);
    } else {
        tracing::info!("Static directory ready at {}", config.static_dir.display());
    }

    let vision_client =
        vision_client::VisionClient::new(config.vision_api_key.clone(), config.vision_base_url.clone());
    let spoonacular_client = spoonacular_client::SpoonacularClient::new(
        config.spoonacular_api_key.clone(),
        config.spoonacular_base_url.clone(),
    );
    let analyzer = NutritionAnalyzer::new(
        Arc::new(vision_client),
        Arc::new(spoonacular_client),
        ChartRenderer::new(config.static_dir.clone()),
    );

    let bind_addr = config.bind_addr.clone();
    let shared_state = Arc::new(AppState { config, analyzer });
    let app = build_router(shared_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .await
        .unwrap();
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::analyze::analyze_routes())
        .merge(handlers::static_files::static_routes())
        .route("/api/status", axum::routing::get(api_status))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,dish_nutrition=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,dish_nutrition=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // LOG_FORMAT=json for log aggregation, human-readable otherwise
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("🍕 Dish nutrition service starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    Ok(())
}

async fn api_status(Extension(state): Extension<Arc<AppState>>) -> axum::response::Json<serde_json::Value> {
    use serde_json::json;

    axum::response::Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "vision": "configured",
            "spoonacular": "configured",
        },
        "static_dir": state.config.static_dir.display().to_string(),
        "endpoints": {
            "analyze": "/analyze",
            "static": "/static/{filename}",
            "status": "/api/status"
        }
    }))
}
