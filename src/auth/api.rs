//! Authentication API Endpoints
//! Mission: Provide signup and login endpoints

use crate::auth::{
    jwt::JwtHandler,
    models::{Account, LoginPayload, LoginResponse, SignupPayload},
    service::{AuthService, ServiceError},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub service: AuthService,
    pub jwt_handler: Arc<JwtHandler>,
}

impl AuthState {
    pub fn new(service: AuthService, jwt_handler: Arc<JwtHandler>) -> Self {
        Self {
            service,
            jwt_handler,
        }
    }
}

/// Signup endpoint - POST /register
pub async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<SignupPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), AuthApiError> {
    let Json(payload) = payload.map_err(AuthApiError::from)?;

    let account = state.service.register(payload).await.map_err(|e| {
        warn!(error = %e, "Registration rejected");
        AuthApiError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// Login endpoint - POST /login
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    let Json(payload) = payload.map_err(AuthApiError::from)?;

    info!("Login attempt");

    let token = state
        .service
        .login(payload, &state.jwt_handler)
        .await
        .map_err(|e| {
            warn!(error = %e, "Login rejected");
            AuthApiError::from(e)
        })?;

    Ok(Json(LoginResponse {
        token,
        expires_in: state.jwt_handler.ttl_seconds(),
    }))
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    BadRequest(String),
    DuplicateAccount,
    InvalidCredentials,
    InternalError,
}

impl From<JsonRejection> for AuthApiError {
    fn from(rejection: JsonRejection) -> Self {
        AuthApiError::BadRequest(format!("Invalid request payload: {}", rejection.body_text()))
    }
}

impl From<ServiceError> for AuthApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => {
                AuthApiError::BadRequest(format!("Validation failed: {msg}"))
            }
            ServiceError::DuplicateAccount => AuthApiError::DuplicateAccount,
            ServiceError::InvalidCredentials => AuthApiError::InvalidCredentials,
            ServiceError::Directory(_) | ServiceError::Hashing(_) | ServiceError::Token(_) => {
                error!(error = %e, "Auth request failed");
                AuthApiError::InternalError
            }
        }
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthApiError::DuplicateAccount => (
                StatusCode::CONFLICT,
                "User with this email already exists".to_string(),
            ),
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AuthApiError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
