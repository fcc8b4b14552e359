//! Registration & Authentication Service
//! Mission: Signup, admin provisioning and login on top of the account directory

use crate::auth::{
    directory::{AccountDirectory, DirectoryError},
    jwt::{JwtHandler, TokenError},
    models::{Account, LoginPayload, Role, SignupPayload},
    password::{CredentialHasher, HashingError},
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("an account with this email already exists")]
    DuplicateAccount,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account directory error: {0}")]
    Directory(String),
    #[error(transparent)]
    Hashing(#[from] HashingError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl From<DirectoryError> for ServiceError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::DuplicateKey => ServiceError::DuplicateAccount,
            other => ServiceError::Directory(other.to_string()),
        }
    }
}

/// Stateless apart from the directory handle; the signing key is supplied per login.
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn AccountDirectory>,
    hasher: CredentialHasher,
    // Hash at the service's cost, verified against on unknown emails so both
    // login failures spend the same bcrypt time.
    decoy_hash: Arc<OnceCell<String>>,
}

const DECOY_PASSWORD: &str = "authgate-decoy-password";

impl AuthService {
    pub fn new(directory: Arc<dyn AccountDirectory>, hasher: CredentialHasher) -> Self {
        Self {
            directory,
            hasher,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Self-service signup; always creates a `user` account
    pub async fn register(&self, payload: SignupPayload) -> Result<Account, ServiceError> {
        self.create_account(payload, Role::User).await
    }

    /// Operator provisioning; creates an `admin` account. Not exposed over HTTP.
    pub async fn create_admin(&self, payload: SignupPayload) -> Result<Account, ServiceError> {
        self.create_account(payload, Role::Admin).await
    }

    async fn create_account(
        &self,
        payload: SignupPayload,
        role: Role,
    ) -> Result<Account, ServiceError> {
        payload
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        // Best-effort pre-check; the directory's unique constraint is authoritative.
        match self.directory.find_by_email(&payload.email).await {
            Ok(_) => return Err(ServiceError::DuplicateAccount),
            Err(DirectoryError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let SignupPayload {
            name,
            email,
            password,
        } = payload;
        let password_hash = self.hash_password(password).await?;

        let account = Account {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role,
            created_at: Utc::now().to_rfc3339(),
        };

        if let Err(e) = self.directory.create(&account).await {
            if matches!(e, DirectoryError::DuplicateKey) {
                warn!(role = role.as_str(), "Lost registration race on duplicate email");
            }
            return Err(e.into());
        }

        info!(account_id = %account.id, role = role.as_str(), "Created account");
        Ok(account.without_credentials())
    }

    /// Check credentials and issue a session token signed by `jwt_handler`
    pub async fn login(
        &self,
        payload: LoginPayload,
        jwt_handler: &JwtHandler,
    ) -> Result<String, ServiceError> {
        payload
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let account = match self.directory.find_by_email(&payload.email).await {
            Ok(account) => account,
            Err(DirectoryError::NotFound) => {
                let decoy = self
                    .decoy_hash
                    .get_or_try_init(|| self.hash_password(DECOY_PASSWORD.to_string()))
                    .await?
                    .clone();
                self.verify_password(payload.password, decoy).await?;
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let valid = self
            .verify_password(payload.password, account.password_hash.clone())
            .await?;
        if !valid {
            return Err(ServiceError::InvalidCredentials);
        }

        let token = jwt_handler.issue(&account)?;
        info!(account_id = %account.id, role = account.role.as_str(), "Login successful");
        Ok(token)
    }

    /// Look up an account by id, credentials stripped
    pub async fn find_account(&self, id: &Uuid) -> Result<Option<Account>, ServiceError> {
        match self.directory.find_by_id(id).await {
            Ok(account) => Ok(Some(account.without_credentials())),
            Err(DirectoryError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, ServiceError> {
        let hasher = self.hasher;
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(HashingError::from)??;
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: String,
        password_hash: String,
    ) -> Result<bool, ServiceError> {
        let hasher = self.hasher;
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
            .await
            .map_err(HashingError::from)??;
        Ok(valid)
    }
}
