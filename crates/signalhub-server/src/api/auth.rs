use crate::auth::create_token;
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{extract::State, Json};
use signalhub_protocol::{LoginRequest, LoginResponse};

/// Demo login: any non-empty username/password pair is accepted and the
/// username becomes the user id carried in the token.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let username = input.username.trim();
    if username.is_empty() || input.password.is_empty() {
        return Err(AppError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let token = create_token(username, &state.config.jwt_secret)?;
    tracing::info!("Issued token for user {}", username);

    Ok(Json(LoginResponse {
        token,
        user_id: username.to_string(),
    }))
}
