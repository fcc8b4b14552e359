//! Dashboard endpoints behind the authorization chain

use crate::auth::{models::Claims, AuthState};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct UserDashboard {
    pub message: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub message: String,
    pub admin_email: String,
    pub secret_info: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /dashboard/user
pub async fn user_dashboard(
    State(state): State<AuthState>,
    Extension(claims): Extension<Claims>,
) -> Json<UserDashboard> {
    // Display name is best effort; the token alone is enough to serve the page.
    let name = match Uuid::parse_str(&claims.sub) {
        Ok(id) => match state.service.find_account(&id).await {
            Ok(account) => account.map(|a| a.name),
            Err(e) => {
                warn!(error = %e, "Account lookup for dashboard failed");
                None
            }
        },
        Err(_) => None,
    };

    Json(UserDashboard {
        message: "Welcome to your user dashboard!".to_string(),
        email: claims.email,
        name,
    })
}

/// GET /dashboard/admin
pub async fn admin_dashboard(Extension(claims): Extension<Claims>) -> Json<AdminDashboard> {
    Json(AdminDashboard {
        message: "Welcome to the Admin Dashboard!".to_string(),
        admin_email: claims.email,
        secret_info: "This is top secret data for admins only.".to_string(),
    })
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
