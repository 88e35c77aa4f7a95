//! Network client for the Anatomica server
//!
//! Every request has a local fallback: the built-in catalog, the mock
//! classifier, and the static label tables. The viewer keeps working
//! when the server only serves files.

use anatomica_core::{DetectionToken, LabelSet, LoadToken, OrganInfo, OrganKey};
use bevy::prelude::*;
use serde::Deserialize;
use std::sync::{Arc, Mutex};

use crate::app::{LoadOrgan, Session, ViewerUi};

pub struct NetworkPlugin;

/// Resource storing the server connection configuration
#[derive(Resource, Clone, Default)]
pub struct ServerConfig {
    /// HTTP(S) base URL (e.g., "http://192.168.1.100:8080"); empty means same-origin
    pub http_url: String,
}

impl ServerConfig {
    /// Create config from URL query parameters or same-origin fallback
    #[cfg(target_arch = "wasm32")]
    pub fn from_browser() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };

        // Check for ?server= query parameter
        if let Ok(search) = window.location().search() {
            if let Some(server_param) = Self::parse_query_param(&search, "server") {
                tracing::info!("Using server from URL parameter: {}", server_param);
                return Self::from_address(&server_param);
            }
        }

        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_browser() -> Self {
        Self::default()
    }

    /// Create config from a server address (host:port or full URL)
    pub fn from_address(addr: &str) -> Self {
        let addr = addr.trim_end_matches('/');
        let http_url = if addr.starts_with("https://") || addr.starts_with("http://") {
            addr.to_string()
        } else {
            format!("http://{}", addr)
        };
        Self { http_url }
    }

    /// Absolute or same-origin URL for an API path
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.http_url, path.trim_start_matches('/'))
    }

    /// Asset path for a model file such as `models/kidney.glb`
    pub fn model_asset_path(&self, model: &str) -> String {
        let model = model.trim_start_matches('/');
        if self.http_url.is_empty() {
            model.to_string()
        } else {
            format!("{}/{}", self.http_url, model)
        }
    }

    /// Parse a query parameter from a search string
    fn parse_query_param(search: &str, param: &str) -> Option<String> {
        let search = search.trim_start_matches('?');
        for pair in search.split('&') {
            let mut parts = pair.splitn(2, '=');
            if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                if key == param && !value.is_empty() {
                    // URL decode the value
                    return Some(value.replace("%3A", ":").replace("%2F", "/"));
                }
            }
        }
        None
    }
}

/// Classification answer from `POST /api/classify`
#[derive(Debug, Clone, Deserialize)]
struct ClassifyResponse {
    organ: OrganKey,
}

/// Catalog fetched from the server
#[derive(Resource, Default)]
pub struct PendingCatalog(pub Arc<Mutex<Option<Vec<OrganInfo>>>>);

/// Organs detected for uploads, tagged with their detection
#[derive(Resource, Default)]
pub struct PendingClassification(pub Arc<Mutex<Vec<(DetectionToken, OrganKey)>>>);

/// Time allowed for the label request before the static table is used
pub const LABEL_REQUEST_TIMEOUT_MS: u32 = 15_000;

/// Label sets waiting to be handed to the session, tagged with their load
#[derive(Resource, Default)]
pub struct PendingLabels(pub Arc<Mutex<Vec<(LoadToken, LabelSet)>>>);

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        // Initialize server config from browser URL
        let server_config = ServerConfig::from_browser();

        app.insert_resource(server_config)
            .init_resource::<PendingCatalog>()
            .init_resource::<PendingClassification>()
            .init_resource::<PendingLabels>()
            .add_systems(Startup, fetch_catalog)
            .add_systems(Update, (process_catalog, process_classification, process_labels));
    }
}

/// Fetch the organ catalog; the built-in one stays in place on failure
fn fetch_catalog(pending: Res<PendingCatalog>, server_config: Res<ServerConfig>) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending_clone = pending.0.clone();
        let url = server_config.api_url("/api/organs");

        spawn_local(async move {
            tracing::info!("Fetching organ catalog from: {}", url);

            match gloo_net::http::Request::get(&url).send().await {
                Ok(response) if response.ok() => match response.json::<Vec<OrganInfo>>().await {
                    Ok(organs) => {
                        if let Ok(mut data) = pending_clone.lock() {
                            *data = Some(organs);
                        }
                    }
                    Err(e) => tracing::warn!("Invalid catalog response: {:?}", e),
                },
                Ok(response) => {
                    tracing::warn!("Catalog request failed with status {}", response.status());
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch catalog: {:?}", e);
                }
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (pending, server_config);
    }
}

fn process_catalog(pending: Res<PendingCatalog>, mut ui: ResMut<ViewerUi>) {
    if let Ok(mut data) = pending.0.try_lock() {
        if let Some(organs) = data.take() {
            if !organs.is_empty() {
                if !organs.iter().any(|o| o.key == ui.chosen) {
                    ui.chosen = organs[0].key;
                }
                ui.catalog = organs;
            }
        }
    }
}

/// Send an uploaded image to the server classifier
///
/// Falls back to the local mock classifier when the server cannot answer.
pub fn classify_upload(
    image: Vec<u8>,
    detection: DetectionToken,
    server_config: &ServerConfig,
    pending: &PendingClassification,
) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending_clone = pending.0.clone();
        let url = server_config.api_url("/api/classify");

        spawn_local(async move {
            tracing::info!("Classifying upload ({} bytes)", image.len());

            let body = js_sys::Uint8Array::from(image.as_slice());
            let organ = match gloo_net::http::Request::post(&url)
                .header("Content-Type", "application/octet-stream")
                .body(body)
            {
                Ok(request) => match request.send().await {
                    Ok(response) if response.ok() => {
                        response.json::<ClassifyResponse>().await.ok().map(|r| r.organ)
                    }
                    Ok(response) => {
                        tracing::warn!("Classification failed with status {}", response.status());
                        None
                    }
                    Err(e) => {
                        tracing::warn!("Classification request failed: {:?}", e);
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to build classification request: {:?}", e);
                    None
                }
            };

            let organ = organ.unwrap_or_else(|| local_classify(&image));
            if let Ok(mut data) = pending_clone.lock() {
                data.push((detection, organ));
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = server_config;
        if let Ok(mut data) = pending.0.lock() {
            data.push((detection, local_classify(&image)));
        }
    }
}

fn local_classify(image: &[u8]) -> OrganKey {
    use anatomica_core::{Classifier, MockClassifier};
    MockClassifier::default().classify(image)
}

fn process_classification(
    pending: Res<PendingClassification>,
    mut session: ResMut<Session>,
    mut ui: ResMut<ViewerUi>,
    mut load_requests: MessageWriter<LoadOrgan>,
) {
    let Ok(mut data) = pending.0.try_lock() else {
        return;
    };
    for (detection, organ) in data.drain(..) {
        // Superseded by a newer upload or a manual load
        let Ok(organ) = session.detection_finished(detection, organ) else {
            continue;
        };
        tracing::info!("Predicted organ: {}", organ);
        ui.predicted = Some(organ);
        ui.chosen = organ;
        load_requests.write(LoadOrgan(organ));
    }
}

/// Request labels for the load identified by `token`
///
/// Any failure, or no answer within [`LABEL_REQUEST_TIMEOUT_MS`], yields
/// the static table for `organ`.
pub fn fetch_labels(
    organ: OrganKey,
    token: LoadToken,
    server_config: &ServerConfig,
    pending: &PendingLabels,
) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending_clone = pending.0.clone();
        let url = server_config.api_url(&format!("/api/labels/{}", organ));

        spawn_local(async move {
            use futures_util::future::{select, Either};
            use gloo_timers::future::TimeoutFuture;

            let request = std::pin::pin!(request_labels(url, organ));
            let timeout = std::pin::pin!(TimeoutFuture::new(LABEL_REQUEST_TIMEOUT_MS));
            let set = match select(request, timeout).await {
                Either::Left((set, _)) => set,
                Either::Right(((), _)) => {
                    tracing::warn!("Label request for {} timed out, using fallback labels", organ);
                    LabelSet::fallback(organ)
                }
            };

            if let Ok(mut data) = pending_clone.lock() {
                data.push((token, set));
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = server_config;
        if let Ok(mut data) = pending.0.lock() {
            data.push((token, LabelSet::fallback(organ)));
        }
    }
}

#[cfg(target_arch = "wasm32")]
async fn request_labels(url: String, organ: OrganKey) -> LabelSet {
    match gloo_net::http::Request::get(&url).send().await {
        Ok(response) if response.ok() => match response.json::<LabelSet>().await {
            Ok(set) if set.organ == organ => set,
            Ok(set) => {
                tracing::warn!("Label set for {} returned for {}", set.organ, organ);
                LabelSet::fallback(organ)
            }
            Err(e) => {
                tracing::warn!("Invalid label response for {}: {:?}", organ, e);
                LabelSet::fallback(organ)
            }
        },
        Ok(response) => {
            tracing::warn!("Label request for {} failed with status {}", organ, response.status());
            LabelSet::fallback(organ)
        }
        Err(e) => {
            tracing::warn!("Failed to fetch labels for {}: {:?}", organ, e);
            LabelSet::fallback(organ)
        }
    }
}

fn process_labels(pending: Res<PendingLabels>, mut session: ResMut<Session>) {
    let Ok(mut data) = pending.0.try_lock() else {
        return;
    };
    for (token, set) in data.drain(..) {
        // Stale sets are rejected and logged by the session
        let _ = session.labels_ready(token, set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_param() {
        assert_eq!(
            ServerConfig::parse_query_param("?foo=1&server=10.0.0.2%3A8080", "server"),
            Some("10.0.0.2:8080".to_string())
        );
        assert_eq!(ServerConfig::parse_query_param("?server=", "server"), None);
        assert_eq!(ServerConfig::parse_query_param("", "server"), None);
    }

    #[test]
    fn test_from_address_adds_scheme() {
        assert_eq!(ServerConfig::from_address("10.0.0.2:8080").http_url, "http://10.0.0.2:8080");
        assert_eq!(
            ServerConfig::from_address("https://viewer.example/").http_url,
            "https://viewer.example"
        );
    }

    #[test]
    fn test_same_origin_urls() {
        let config = ServerConfig::default();
        assert_eq!(config.api_url("/api/organs"), "/api/organs");
        assert_eq!(config.model_asset_path("models/heart.glb"), "models/heart.glb");
    }

    #[test]
    fn test_remote_urls() {
        let config = ServerConfig::from_address("10.0.0.2:8080");
        assert_eq!(config.api_url("/api/labels/heart"), "http://10.0.0.2:8080/api/labels/heart");
        assert_eq!(
            config.model_asset_path("/models/heart.glb"),
            "http://10.0.0.2:8080/models/heart.glb"
        );
    }

    #[test]
    fn test_native_classification_keeps_detection_tag() {
        let mut session = anatomica_core::ViewerSession::new();
        let detection = session.begin_detection();
        let pending = PendingClassification::default();
        classify_upload(vec![0xff, 0xd8], detection, &ServerConfig::default(), &pending);

        let queued = pending.0.lock().unwrap();
        assert_eq!(queued.as_slice(), &[(detection, OrganKey::Liver)]);
    }

    #[test]
    fn test_native_fetch_labels_uses_fallback_table() {
        let mut session = anatomica_core::ViewerSession::new();
        let token = session.begin_load(OrganKey::Kidney1);
        let pending = PendingLabels::default();
        fetch_labels(OrganKey::Kidney1, token, &ServerConfig::default(), &pending);

        let queued = pending.0.lock().unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].0, token);
        assert_eq!(queued[0].1.labels.len(), 10);
    }
}
