//! Per-request response policy: host allow-list and CORS.
//!
//! Both are built from a [`RequestPolicy`] value handed to the router at
//! construction time.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::RequestPolicy;

/// Reject requests whose `Host` is not in the allow-list with 403
pub async fn enforce_allowed_hosts(
    State(policy): State<Arc<RequestPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    if policy.allowed_hosts.is_empty() {
        return next.run(request).await;
    }

    let hostname = request_hostname(&request).unwrap_or_default();
    if policy.allowed_hosts.iter().any(|allowed| allowed.eq_ignore_ascii_case(&hostname)) {
        next.run(request).await
    } else {
        tracing::warn!("Rejected request for host '{}'", hostname);
        (StatusCode::FORBIDDEN, format!("{} not allowed", hostname)).into_response()
    }
}

/// Hostname without port, from the `Host` header or an absolute request URI
fn request_hostname(request: &Request) -> Option<String> {
    if let Some(host) = request.uri().host() {
        return Some(host.to_string());
    }
    let raw = request.headers().get(header::HOST)?.to_str().ok()?;
    let authority: axum::http::uri::Authority = raw.parse().ok()?;
    Some(authority.host().to_string())
}

/// CORS layer for every route, preflight included
pub fn cors_layer(policy: &RequestPolicy) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(policy.cors_max_age_secs));

    if policy.cors_allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = policy
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
