use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use std::sync::Arc;

use crate::app::build_router;
use crate::config::{Config, GeocoderConfig, RequestPolicy, StoreBackend, UploadConfig};
use crate::geocode::{Coordinates, GeocodeError, Geocoder};
use crate::ledger::Ledger;
use crate::objects::LocalObjectStore;
use crate::state::AppState;
use crate::store::MemoryStore;

/// Geocoder answering every address with the same result
pub struct StubGeocoder(pub Result<Coordinates, u16>);

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, _address: &str) -> Result<Coordinates, GeocodeError> {
        self.0.map_err(GeocodeError::Status)
    }
}

pub fn test_config() -> Config {
    let upload_dir = std::env::temp_dir().join(format!("intake-ledger-{}", uuid::Uuid::new_v4()));
    Config {
        store: StoreBackend::Memory,
        geocoder: GeocoderConfig {
            base_url: "http://127.0.0.1:9/places".to_string(),
            access_token: "pk.test".to_string(),
            timeout_secs: 1,
        },
        policy: RequestPolicy {
            allowed_hosts: Vec::new(),
            cors_allowed_origins: vec!["*".to_string()],
            cors_max_age_secs: 86400,
        },
        upload: UploadConfig {
            dir: upload_dir.to_string_lossy().into_owned(),
            public_base_url: "https://cdn.example.dev/uploads".to_string(),
            max_bytes: 1024,
        },
        list_page_size: 2,
        service_port: 3000,
        service_host: "0.0.0.0".to_string(),
    }
}

pub fn setup_test_app_with(config: Config, geocoder: StubGeocoder) -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    let state = AppState {
        ledger: Ledger::new(Arc::new(store.clone()), Arc::new(geocoder), config.list_page_size),
        objects: Arc::new(LocalObjectStore::from_config(&config.upload)),
        config: Arc::new(config),
    };
    (build_router(state), store)
}

/// App with an in-memory store and a geocoder that always finds 1 Market St
pub fn setup_test_app() -> (Router, MemoryStore) {
    setup_test_app_with(test_config(), StubGeocoder(Ok(Coordinates(-122.42, 37.77))))
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn sample_record(order_id: &str) -> serde_json::Value {
    serde_json::json!([{
        "orderId": order_id,
        "intakeMethods": "dropoff",
        "clientInfo": {"name": "Ada", "address": "1 Market St"}
    }])
}
