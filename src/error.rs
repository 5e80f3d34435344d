use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    backend::StoreError,
    response::{ApiResponse, Meta},
    services::{auth_service::AuthError, cart_service::CartError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    SignUp,
    Login,
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthAction::SignUp => f.write_str("Sign up"),
            AuthAction::Login => f.write_str("Login"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    /// Every signup or login failure surfaces with the same message; the cause
    /// stays attached for logs and callers that inspect it.
    #[error("{action} failed")]
    AuthFailed {
        action: AuthAction,
        #[source]
        source: AuthError,
    },

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Storage error")]
    Store(#[from] StoreError),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn sign_up_failed(source: AuthError) -> Self {
        AppError::AuthFailed {
            action: AuthAction::SignUp,
            source,
        }
    }

    pub fn login_failed(source: AuthError) -> Self {
        AppError::AuthFailed {
            action: AuthAction::Login,
            source,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::AuthFailed {
                action: AuthAction::SignUp,
                ..
            } => StatusCode::BAD_REQUEST,
            AppError::AuthFailed {
                action: AuthAction::Login,
                ..
            } => StatusCode::UNAUTHORIZED,
            AppError::Cart(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
