//! Account Directory
//! Mission: Storage-agnostic lookup and creation of accounts
//!
//! Email uniqueness is the directory's job: `create` must fail with
//! `DuplicateKey` when the email is already taken, even when two creates race.

use crate::auth::models::Account;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("account not found")]
    NotFound,
    #[error("an account with this key already exists")]
    DuplicateKey,
    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn create(&self, account: &Account) -> Result<(), DirectoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Account, DirectoryError>;
    async fn find_by_id(&self, id: &Uuid) -> Result<Account, DirectoryError>;
}

/// In-process directory, used by tests and for ephemeral runs
#[derive(Default)]
pub struct MemoryDirectory {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

#[async_trait]
impl AccountDirectory for MemoryDirectory {
    async fn create(&self, account: &Account) -> Result<(), DirectoryError> {
        // Check and insert under one write lock.
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&account.id) || accounts.values().any(|a| a.email == account.email)
        {
            return Err(DirectoryError::DuplicateKey);
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, DirectoryError> {
        self.accounts
            .read()
            .values()
            .find(|a| a.email == email)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Account, DirectoryError> {
        self.accounts
            .read()
            .get(id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }
}
