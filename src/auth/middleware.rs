//! Authorization Middleware
//! Mission: Protect API endpoints with bearer-token validation and role gating
//!
//! Two independent layers: `auth_middleware` verifies the token and attaches
//! `Claims` to the request; `require_admin` is stacked inside it on admin routes.

use crate::auth::{
    jwt::JwtHandler,
    models::{Claims, Role},
};
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

const BEARER_PREFIX: &str = "Bearer ";

/// Auth middleware that validates JWT tokens
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;

    let token = header_value
        .to_str()
        .ok()
        .and_then(|s| s.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::InvalidFormat)?;

    // Invalid and expired collapse to the same rejection
    let claims = jwt_handler
        .verify(token)
        .map_err(|_| AuthError::InvalidToken)?;

    // Add claims to request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Role gate; must run after `auth_middleware`
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AuthError> {
    let is_admin = match extract_claims(&req) {
        Some(claims) if claims.role == Role::Admin => true,
        Some(claims) => {
            debug!(sub = %claims.sub, role = claims.role.as_str(), "Admin route refused");
            false
        }
        None => false,
    };

    if !is_admin {
        return Err(AuthError::Forbidden);
    }
    Ok(next.run(req).await)
}

/// Extract claims from request (use after auth middleware)
pub fn extract_claims(req: &Request) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}

/// Auth error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidFormat,
    InvalidToken,
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Authorization header required"),
            AuthError::InvalidFormat => (
                StatusCode::UNAUTHORIZED,
                "Invalid authorization format. Use: Bearer {token}",
            ),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden: Admins only"),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Account;
    use axum::{
        body::Body,
        http::Request as HttpRequest,
        middleware::{from_fn, from_fn_with_state},
        routing::get,
        Extension, Router,
    };
    use chrono::{Duration, Utc};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "middleware-test-secret";

    fn jwt() -> Arc<JwtHandler> {
        Arc::new(JwtHandler::new(SECRET, 72).unwrap())
    }

    fn account(role: Role) -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
            password_hash: String::new(),
            role,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    async fn whoami(Extension(claims): Extension<Claims>) -> String {
        claims.email
    }

    fn app(jwt: Arc<JwtHandler>) -> Router {
        let admin = Router::new()
            .route("/admin", get(whoami))
            .route_layer(from_fn(require_admin));

        Router::new()
            .route("/user", get(whoami))
            .merge(admin)
            .route_layer(from_fn_with_state(jwt, auth_middleware))
    }

    async fn status_for(uri: &str, auth: Option<String>) -> StatusCode {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let req = builder.body(Body::empty()).unwrap();
        app(jwt()).oneshot(req).await.unwrap().status()
    }

    #[test]
    fn test_auth_error_responses() {
        let missing = AuthError::MissingToken.into_response();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let invalid_format = AuthError::InvalidFormat.into_response();
        assert_eq!(invalid_format.status(), StatusCode::UNAUTHORIZED);

        let invalid_token = AuthError::InvalidToken.into_response();
        assert_eq!(invalid_token.status(), StatusCode::UNAUTHORIZED);

        let forbidden = AuthError::Forbidden.into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_extract_claims_from_request() {
        let mut req = HttpRequest::new(Body::empty());
        assert!(extract_claims(&req).is_none());

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "test@x.com".to_string(),
            role: Role::User,
            iat: now,
            exp: now + 60,
        };
        req.extensions_mut().insert(claims);

        assert_eq!(extract_claims(&req).unwrap().email, "test@x.com");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        assert_eq!(status_for("/user", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for("/admin", None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let status = status_for("/user", Some("Bearer garbage".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_bearer_prefix_is_unauthorized() {
        let token = jwt().issue(&account(Role::User)).unwrap();
        assert_eq!(
            status_for("/user", Some(token.clone())).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for("/user", Some(format!("Token {token}"))).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let token = jwt().issue(&account(Role::User)).unwrap();
        let req = HttpRequest::builder()
            .uri("/user")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let res = app(jwt()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ada@x.com");
    }

    #[tokio::test]
    async fn test_expired_and_invalid_are_indistinguishable() {
        let handler = jwt();
        let expired = handler
            .issue_at(&account(Role::User), Utc::now() - Duration::hours(100))
            .unwrap();

        let expired_res = app(jwt())
            .oneshot(
                HttpRequest::builder()
                    .uri("/user")
                    .header(header::AUTHORIZATION, format!("Bearer {expired}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let garbage_res = app(jwt())
            .oneshot(
                HttpRequest::builder()
                    .uri("/user")
                    .header(header::AUTHORIZATION, "Bearer garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(expired_res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(garbage_res.status(), StatusCode::UNAUTHORIZED);

        let a = axum::body::to_bytes(expired_res.into_body(), usize::MAX)
            .await
            .unwrap();
        let b = axum::body::to_bytes(garbage_res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_admin_route_role_gate() {
        let user_token = jwt().issue(&account(Role::User)).unwrap();
        let admin_token = jwt().issue(&account(Role::Admin)).unwrap();

        assert_eq!(
            status_for("/admin", Some(format!("Bearer {user_token}"))).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for("/admin", Some(format!("Bearer {admin_token}"))).await,
            StatusCode::OK
        );
        // Admins can use user routes too
        assert_eq!(
            status_for("/user", Some(format!("Bearer {admin_token}"))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_role_gate_without_auth_is_forbidden() {
        let app = Router::new()
            .route("/admin", get(|| async { "secret" }))
            .route_layer(from_fn(require_admin));

        let res = app
            .oneshot(HttpRequest::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
