//! Authentication Module
//! Mission: Credential hashing, JWT session tokens, account directory and RBAC gates

pub mod api;
pub mod directory;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod user_store;

pub use api::AuthState;
pub use directory::{AccountDirectory, DirectoryError, MemoryDirectory};
pub use jwt::{JwtHandler, TokenError};
pub use middleware::{auth_middleware, require_admin};
pub use models::{Account, Claims, Role};
pub use password::CredentialHasher;
pub use service::{AuthService, ServiceError};
pub use user_store::SqliteDirectory;
