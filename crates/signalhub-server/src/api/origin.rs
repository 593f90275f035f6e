use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

const SEC_WEBSOCKET_ORIGIN: &str = "sec-websocket-origin";

/// Origin of the request: `Origin`, or `Sec-WebSocket-Origin` for older
/// WebSocket clients.
fn request_origin(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ORIGIN)
        .or_else(|| headers.get(SEC_WEBSOCKET_ORIGIN))
        .and_then(|value| value.to_str().ok())
        .filter(|origin| !origin.is_empty())
}

/// Refuse browser requests from origins outside the allow-list. Requests that
/// carry no origin at all pass through.
pub async fn filter_origin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let rejected = request_origin(request.headers())
        .filter(|origin| !state.config.allowed_origins.iter().any(|a| a.as_str() == *origin))
        .map(str::to_owned);

    if let Some(origin) = rejected {
        tracing::warn!("Rejected request from origin {}", origin);
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Origin not allowed" })),
        )
            .into_response();
    }

    next.run(request).await
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring malformed allowed origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}
