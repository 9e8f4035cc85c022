//! Bearer-token extractor: turns an Authorization header into a caller
//! identity once, so handlers never touch raw tokens.

use std::str::FromStr;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use db::models::user::UserRole;
use services::services::tickets::Caller;

use crate::{AppState, error::ApiError};

/// Authenticated caller, resolved per request from a self-contained token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.id,
            role: self.role.clone(),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Auth("missing authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Auth("expected a bearer token".to_string()))?;

        let claims = state.auth.verify_token(token)?;
        let role = UserRole::from_str(&claims.role)
            .map_err(|_| ApiError::Auth("invalid role claim".to_string()))?;

        Ok(Self {
            id: claims.uid,
            email: claims.sub,
            role,
        })
    }
}
