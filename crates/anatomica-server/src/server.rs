//! Web server setup and routing

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api;
use crate::state::AppState;

/// Largest accepted image upload
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // API routes
        .route("/api/organs", get(api::list_organs))
        .route(
            "/api/classify",
            post(api::classify).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/labels/{organ}", get(api::get_labels))
        // Serve models
        .nest_service("/models", ServeDir::new(&state.config.models.path))
        // Static files (WASM frontend) - must be fallback for root
        .fallback_service(ServeDir::new(&state.config.server.web_dir))
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // State
        .with_state(state)
}

/// Run the web server
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use anatomica_core::{LabelSet, LabelSource, OrganInfo, OrganKey};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app(config: Config) -> Router {
        router(AppState::new(config).unwrap())
    }

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.generation.enabled = false;
        config
    }

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, Option<T>) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).ok())
    }

    #[tokio::test]
    async fn test_list_organs() {
        let (status, organs) = get_json::<Vec<OrganInfo>>(app(offline_config()), "/api/organs").await;
        assert_eq!(status, StatusCode::OK);
        let organs = organs.unwrap();
        assert_eq!(organs.len(), 8);
        assert_eq!(organs[0].key, OrganKey::Lung);
        assert_eq!(organs[6].model, "models/kidney.glb");
    }

    #[tokio::test]
    async fn test_classify_returns_configured_organ() {
        let mut config = offline_config();
        config.classifier.organ = OrganKey::Heart2;
        let response = app(config)
            .oneshot(
                Request::post("/api/classify")
                    .body(Body::from(vec![0u8; 1024]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["organ"], "heart2");
    }

    #[tokio::test]
    async fn test_kidney_labels_without_generation() {
        let (status, set) = get_json::<LabelSet>(app(offline_config()), "/api/labels/kidney1").await;
        assert_eq!(status, StatusCode::OK);
        let set = set.unwrap();
        assert_eq!(set.source, LabelSource::Fallback);
        assert_eq!(set.labels.len(), 10);
    }

    #[tokio::test]
    async fn test_unreachable_generator_falls_back() {
        let mut config = Config::default();
        config.generation.api_url = "http://127.0.0.1:9/models/m".to_string();
        config.generation.api_key = "test".to_string();
        config.generation.timeout_secs = 5;

        let (status, set) = get_json::<LabelSet>(app(config), "/api/labels/heart").await;
        assert_eq!(status, StatusCode::OK);
        let set = set.unwrap();
        assert_eq!(set.source, LabelSource::Fallback);
        assert!(!set.labels.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_organ_is_not_found() {
        let (status, body) = get_json::<serde_json::Value>(app(offline_config()), "/api/labels/spleen").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.unwrap()["error"], "Unknown organ: spleen");
    }

    #[tokio::test]
    async fn test_teeth_has_empty_label_set() {
        let (_, set) = get_json::<LabelSet>(app(offline_config()), "/api/labels/teeth").await;
        assert!(set.unwrap().labels.is_empty());
    }
}
