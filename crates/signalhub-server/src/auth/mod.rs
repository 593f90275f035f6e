use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{headers, TypedHeader};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, expires_in_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            exp: (now + Duration::hours(expires_in_hours)).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
        }
    }
}

pub fn create_token(user_id: &str, secret: &str) -> Result<String> {
    let claims = Claims::new(user_id, TOKEN_LIFETIME_HOURS);

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    // Header::default() and Validation::default() both pin HS256
    let mut validation = Validation::default();
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

/// Extractor for authenticated requests
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let TypedHeader(auth_header) = parts
            .extract::<TypedHeader<headers::Authorization<headers::authorization::Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized)?;

        let claims = verify_token(auth_header.token(), &state.config.jwt_secret)?;

        Ok(AuthUser {
            user_id: claims.user_id,
        })
    }
}
