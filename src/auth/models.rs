//! Authentication Models
//! Mission: Define account, role and session-claim data structures

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Account record held by the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: Role,
    pub created_at: String,
}

impl Account {
    /// Copy of the account with the credential hash blanked out
    pub fn without_credentials(mut self) -> Self {
        self.password_hash.clear();
        self
    }
}

/// Account roles for RBAC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User, // Regular dashboard access
    #[serde(rename = "admin")]
    Admin, // Admin dashboard + provisioning
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Exact match only; stored roles are always lowercase.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // subject (account id)
    pub email: String,
    pub role: Role,
    pub iat: i64, // issued-at, unix seconds
    pub exp: i64, // expiration, unix seconds
}

/// Signup request body (also used by the create-admin command)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupPayload {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

/// Login request body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64, // seconds until expiration
}
