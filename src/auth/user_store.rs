//! Account Storage
//! Mission: Persist accounts in SQLite with an authoritative unique-email constraint

use crate::auth::{
    directory::{AccountDirectory, DirectoryError},
    models::{Account, Role},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

/// Account directory with SQLite backend
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    db_path: PathBuf,
}

impl SqliteDirectory {
    /// Open (or create) the database and run migrations
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };
        store.init_db()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<()> {
        info!(path = %self.db_path.display(), "Running account migrations");

        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open database: {}", self.db_path.display()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create users table")?;

        info!("Account migrations completed");
        Ok(())
    }

    /// Run a blocking database operation off the async executor
    async fn with_conn<T, F>(&self, op: F) -> Result<T, DirectoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DirectoryError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(storage_error)?;
            op(&conn)
        })
        .await
        .map_err(|e| DirectoryError::Storage(format!("database task failed: {e}")))?
    }
}

fn storage_error(e: rusqlite::Error) -> DirectoryError {
    DirectoryError::Storage(e.to_string())
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let id: String = row.get(0)?;
    let role: String = row.get(4)?;

    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let role = Role::parse(&role).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown role '{role}'").into(),
        )
    })?;

    Ok(Account {
        id,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role,
        created_at: row.get(5)?,
    })
}

fn find_one(conn: &Connection, column: &str, key: String) -> Result<Account, DirectoryError> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE {column} = ?1");
    conn.query_row(&sql, params![key], account_from_row)
        .optional()
        .map_err(storage_error)?
        .ok_or(DirectoryError::NotFound)
}

#[async_trait]
impl AccountDirectory for SqliteDirectory {
    async fn create(&self, account: &Account) -> Result<(), DirectoryError> {
        let account = account.clone();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, name, email, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    account.id.to_string(),
                    account.name,
                    account.email,
                    account.password_hash,
                    account.role.as_str(),
                    account.created_at,
                ],
            );

            match inserted {
                Ok(_) => {
                    debug!(account_id = %account.id, role = account.role.as_str(), "Inserted account");
                    Ok(())
                }
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Err(DirectoryError::DuplicateKey)
                }
                Err(e) => Err(storage_error(e)),
            }
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, DirectoryError> {
        let email = email.to_string();
        self.with_conn(move |conn| find_one(conn, "email", email))
            .await
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Account, DirectoryError> {
        let id = id.to_string();
        self.with_conn(move |conn| find_one(conn, "id", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (SqliteDirectory, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SqliteDirectory::new(temp_file.path()).unwrap();
        (store, temp_file)
    }

    fn account(email: &str, role: Role) -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$hash".to_string(),
            role,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_create_and_retrieve_account() {
        let (store, _temp) = create_test_store();
        let admin = account("admin@x.com", Role::Admin);
        store.create(&admin).await.unwrap();

        let by_email = store.find_by_email("admin@x.com").await.unwrap();
        assert_eq!(by_email.id, admin.id);
        assert_eq!(by_email.role, Role::Admin);
        assert_eq!(by_email.password_hash, admin.password_hash);

        let by_id = store.find_by_id(&admin.id).await.unwrap();
        assert_eq!(by_id.email, "admin@x.com");
        assert_eq!(by_id.name, "Ada");
    }

    #[tokio::test]
    async fn test_missing_account_is_not_found() {
        let (store, _temp) = create_test_store();

        assert!(matches!(
            store.find_by_email("nobody@x.com").await,
            Err(DirectoryError::NotFound)
        ));
        assert!(matches!(
            store.find_by_id(&Uuid::new_v4()).await,
            Err(DirectoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_unique_email_constraint() {
        let (store, _temp) = create_test_store();
        store.create(&account("ada@x.com", Role::User)).await.unwrap();

        let result = store.create(&account("ada@x.com", Role::Admin)).await;
        assert!(matches!(result, Err(DirectoryError::DuplicateKey)));
    }

    #[tokio::test]
    async fn test_concurrent_creates_single_winner() {
        let (store, _temp) = create_test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.create(&account("race@x.com", Role::User)).await
                })
            })
            .collect();

        let mut wins = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => wins += 1,
                Err(DirectoryError::DuplicateKey) => {}
                // SQLITE_BUSY under write contention is still a failed create
                Err(DirectoryError::Storage(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_reopen_preserves_accounts() {
        let temp_file = NamedTempFile::new().unwrap();
        let ada = account("ada@x.com", Role::User);
        {
            let store = SqliteDirectory::new(temp_file.path()).unwrap();
            store.create(&ada).await.unwrap();
        }

        let reopened = SqliteDirectory::new(temp_file.path()).unwrap();
        let found = reopened.find_by_email("ada@x.com").await.unwrap();
        assert_eq!(found.id, ada.id);
    }
}
