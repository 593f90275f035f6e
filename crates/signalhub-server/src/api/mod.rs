mod auth;
mod origin;
mod rooms;

use crate::state::AppState;
use crate::ws;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let cors = origin::cors_layer(&state.config.allowed_origins);

    Router::new()
        // Health check
        .route("/health", get(health))
        // Auth routes
        .route("/api/auth/login", post(auth::login))
        // Room directory
        .route("/api/rooms", post(rooms::create_room))
        .route(
            "/api/rooms/{room_id}",
            get(rooms::get_room).delete(rooms::delete_room),
        )
        // WebSocket signaling, by room id or code
        .route("/ws/signal/{room_id}", get(ws::handler::ws_handler))
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            origin::filter_origin,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
