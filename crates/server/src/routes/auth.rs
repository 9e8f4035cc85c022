//! Signup, login and current-user routes.

use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::{LoginRequest, SignupRequest, TokenResponse, UserInfo};
use utils::response::ApiResponse;

use crate::{AppState, auth::AuthUser, error::ApiError};

/// POST /api/auth/signup
/// Register a campus account and return a bearer token.
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<ResponseJson<ApiResponse<TokenResponse>>, ApiError> {
    let response = state.auth.signup(payload).await?;
    Ok(ResponseJson(ApiResponse::success(response)))
}

/// POST /api/auth/login
/// Exchange email and password for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<TokenResponse>>, ApiError> {
    let response = state.auth.login(payload).await?;
    Ok(ResponseJson(ApiResponse::success(response)))
}

/// GET /api/auth/me
/// Resolve the account behind the presented token.
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<UserInfo>>, ApiError> {
    let info = state.auth.current_user(&user.email).await?;
    Ok(ResponseJson(ApiResponse::success(info)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/signup", post(signup))
            .route("/login", post(login))
            .route("/me", get(me)),
    )
}
