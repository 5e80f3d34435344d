use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::auth::{LoginRequest, LoginResponse, SignUpRequest},
    error::AppResult,
    models::UserAccount,
    response::ApiResponse,
    services::auth_service::{login_user, sign_up_user},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/login", post(login))
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created with role", body = ApiResponse<UserAccount>),
        (status = 400, description = "Sign up failed")
    ),
    tag = "Auth"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserAccount>>)> {
    let resp = sign_up_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token, account and landing destination", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Login failed")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = login_user(&state, payload).await?;
    Ok(Json(resp))
}
