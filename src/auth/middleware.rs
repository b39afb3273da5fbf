use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use super::{TokenGenerator, parse_token};
use crate::server::AppState;
use crate::types::{SessionToken, User};

/// Extractor resolving `Authorization: Bearer` into the authenticated user.
/// Handlers receive the principal as a typed value; nothing is stashed in
/// request extensions.
pub struct RequireUser {
    pub token: SessionToken,
    pub user: User,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({
            "success": false,
            "status": status.as_u16(),
            "message": message,
            "errors": [],
        });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                "Bearer realm=\"coterie\"".parse().expect("static header"),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let raw_token = match auth_header {
            Some(header) if header.starts_with("Bearer ") => {
                header.trim_start_matches("Bearer ").to_string()
            }
            Some(_) => return Err(AuthError::InvalidScheme),
            None => return Err(AuthError::MissingAuth),
        };

        let (lookup, _secret) =
            parse_token(&raw_token).map_err(|_| AuthError::InvalidToken)?;

        let token = state
            .store
            .get_session_by_lookup(&lookup)
            .map_err(|_| AuthError::InternalError)?
            .ok_or(AuthError::InvalidToken)?;

        let generator = TokenGenerator::new();
        if !generator
            .verify(&raw_token, &token.token_hash)
            .map_err(|_| AuthError::InternalError)?
        {
            return Err(AuthError::InvalidToken);
        }

        if let Some(expires_at) = &token.expires_at {
            if expires_at < &Utc::now() {
                return Err(AuthError::TokenExpired);
            }
        }

        let user = state
            .store
            .get_user(&token.user_id)
            .map_err(|_| AuthError::InternalError)?
            .ok_or(AuthError::InvalidToken)?;

        if let Err(e) = state.store.touch_session(&token.id) {
            tracing::warn!("Failed to update session last_used_at: {e}");
        }

        Ok(RequireUser { token, user })
    }
}
