use axum::{
    http::{header, HeaderName, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::{any::Any, time::Duration};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
};
use tracing::error;

use crate::api::dashboard::{admin_dashboard, health_check, user_dashboard};
use crate::auth::{api as auth_api, auth_middleware, require_admin, AuthState};
use crate::middleware::request_logging;

/// Create the API router
///
/// Public: `/health`, `/register`, `/login`.
/// Bearer token: `/dashboard/user`. Bearer token + admin role: `/dashboard/admin`.
pub fn create_router(state: AuthState) -> Router {
    let admin_routes = Router::new()
        .route("/dashboard/admin", get(admin_dashboard))
        .route_layer(middleware::from_fn(require_admin));

    let protected_routes = Router::new()
        .route("/dashboard/user", get(user_dashboard))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.jwt_handler.clone(),
            auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/register", post(auth_api::register))
        .route("/login", post(auth_api::login));

    with_http_layers(
        Router::new()
            .merge(public_routes)
            .merge(protected_routes)
            .with_state(state),
    )
}

/// Outer stack shared by every route: panic recovery, request logging, CORS.
/// A panicking handler fails only its own request, with a logged 500.
fn with_http_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    error!(panic = detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}
