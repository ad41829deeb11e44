// src/handlers/static_files.rs
use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::error::AppError;
use crate::AppState;

pub fn static_routes() -> Router {
    Router::new().route("/static/:filename", get(serve_static_file))
}

/// Stream a file from the static directory (rendered charts).
async fn serve_static_file(
    Path(filename): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, AppError> {
    if !is_safe_file_name(&filename) {
        tracing::warn!("Rejected static file request for '{}'", filename);
        return Err(AppError::NotFound);
    }

    let file_path = state.config.static_dir.join(&filename);

    let file = match tokio::fs::File::open(&file_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => {
            return Err(AppError::Internal(format!(
                "Failed to open {}: {}",
                file_path.display(),
                e
            )))
        }
    };

    let stream = ReaderStream::new(file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&file_path))
        .header(header::CACHE_CONTROL, "no-cache")
        .body(axum::body::Body::from_stream(stream))
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}

fn content_type_for(path: &FsPath) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "css" => "text/css",
        "js" => "application/javascript",
        "html" => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::services::analysis::fakes::{FixedRecognizer, StaticNutrition};
    use crate::services::{ChartRenderer, NutritionAnalyzer};
    use axum_test::TestServer;
    use std::path::PathBuf;

    fn server_for(static_dir: PathBuf) -> TestServer {
        let config = AppConfig {
            vision_api_key: "v".to_string(),
            spoonacular_api_key: "s".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            public_base_url: None,
            static_dir: static_dir.clone(),
            vision_base_url: "http://127.0.0.1:1".to_string(),
            spoonacular_base_url: "http://127.0.0.1:1".to_string(),
        };
        let analyzer = NutritionAnalyzer::new(
            Arc::new(FixedRecognizer::new("Unknown")),
            Arc::new(StaticNutrition::empty()),
            ChartRenderer::new(static_dir),
        );
        let state = Arc::new(AppState { config, analyzer });
        TestServer::new(static_routes().layer(Extension(state))).unwrap()
    }

    #[test]
    fn test_safe_file_names() {
        assert!(is_safe_file_name("chart.png"));
        assert!(is_safe_file_name("0b7c_chart.png"));
        assert!(!is_safe_file_name(""));
        assert!(!is_safe_file_name("../Cargo.toml"));
        assert!(!is_safe_file_name("..\\secrets"));
        assert!(!is_safe_file_name(".env"));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(FsPath::new("a_chart.png")), "image/png");
        assert_eq!(content_type_for(FsPath::new("photo.JPG")), "image/jpeg");
        assert_eq!(content_type_for(FsPath::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_serves_existing_file_and_404s_otherwise() {
        let dir = std::env::temp_dir().join(format!("dish-nutrition-test-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("note.txt"), b"hello").await.unwrap();

        let server = server_for(dir.clone());

        let response = server.get("/static/note.txt").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "hello");

        server
            .get("/static/missing.png")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get("/static/..%2FCargo.toml")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
