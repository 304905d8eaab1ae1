//! Key/value blob storage.
//!
//! Everything the portal persists is a string value under a `(namespace,
//! key)` pair: the chat log, the live video id, each user's trade journal
//! and pending payments. Values that hold lists are rewritten whole, so the
//! last write wins across processes.
//!
//! # Backends
//!
//! - [`PgBlobStore`] - `PostgreSQL` table `portal.blob`
//! - [`MemoryBlobStore`] - process memory, used when no database is
//!   configured (development, tests)

mod memory;
mod postgres;

pub use memory::MemoryBlobStore;
pub use postgres::PgBlobStore;

use std::borrow::Cow;

use bookvision_core::UserId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use thiserror::Error;

/// Shared key holding the chat log.
pub const CHAT_MESSAGES_KEY: &str = "chat-messages";
/// Shared key holding the current live video id.
pub const LIVE_VIDEO_KEY: &str = "current-live-id";
/// Private key holding a user's trade journal.
pub const USER_TRADES_KEY: &str = "user-trades";

/// Shared keys only writable through their dedicated endpoints.
pub const RESERVED_SHARED_KEYS: &[&str] = &[CHAT_MESSAGES_KEY, LIVE_VIDEO_KEY];
/// Private keys only writable through their dedicated endpoints.
pub const RESERVED_PRIVATE_KEYS: &[&str] = &[USER_TRADES_KEY];

/// Errors from the blob store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Which namespace a key lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Visible to every subscriber.
    Shared,
    /// Private to one identity user.
    User(UserId),
    /// Payments awaiting signup, keyed by email.
    PendingPayments,
}

impl Scope {
    /// Resolve the storage API's `shared` flag for the calling user.
    #[must_use]
    pub fn for_request(shared: bool, user_id: &UserId) -> Self {
        if shared {
            Self::Shared
        } else {
            Self::User(user_id.clone())
        }
    }

    /// Namespace string stored in the backend.
    #[must_use]
    pub fn namespace(&self) -> Cow<'static, str> {
        match self {
            Self::Shared => Cow::Borrowed("shared"),
            Self::User(id) => Cow::Owned(format!("user:{id}")),
            Self::PendingPayments => Cow::Borrowed("payments-pending"),
        }
    }

    /// Whether `key` in this scope is owned by a dedicated endpoint.
    #[must_use]
    pub fn is_reserved(&self, key: &str) -> bool {
        match self {
            Self::Shared => RESERVED_SHARED_KEYS.contains(&key),
            Self::User(_) => RESERVED_PRIVATE_KEYS.contains(&key),
            Self::PendingPayments => true,
        }
    }
}

/// The configured storage backend.
#[derive(Clone)]
pub enum BlobStore {
    Postgres(PgBlobStore),
    Memory(MemoryBlobStore),
}

impl BlobStore {
    /// A `PostgreSQL`-backed store.
    #[must_use]
    pub const fn postgres(pool: PgPool) -> Self {
        Self::Postgres(PgBlobStore::new(pool))
    }

    /// An empty in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryBlobStore::default())
    }

    /// Backend name, for logs and health output.
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    /// Read a raw value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the backend query fails.
    pub async fn get(&self, scope: &Scope, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Self::Postgres(store) => store.get(&scope.namespace(), key).await,
            Self::Memory(store) => Ok(store.get(&scope.namespace(), key).await),
        }
    }

    /// Write a raw value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the backend query fails.
    pub async fn set(&self, scope: &Scope, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Self::Postgres(store) => store.set(&scope.namespace(), key, value).await,
            Self::Memory(store) => {
                store.set(&scope.namespace(), key, value).await;
                Ok(())
            }
        }
    }

    /// Delete a value, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the backend query fails.
    pub async fn delete(&self, scope: &Scope, key: &str) -> Result<bool, StorageError> {
        match self {
            Self::Postgres(store) => store.delete(&scope.namespace(), key).await,
            Self::Memory(store) => Ok(store.delete(&scope.namespace(), key).await),
        }
    }

    /// Keys in a namespace starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the backend query fails.
    pub async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StorageError> {
        match self {
            Self::Postgres(store) => store.list(&scope.namespace(), prefix).await,
            Self::Memory(store) => Ok(store.list(&scope.namespace(), prefix).await),
        }
    }

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the database cannot be queried.
    pub async fn ping(&self) -> Result<(), StorageError> {
        match self {
            Self::Postgres(store) => store.ping().await,
            Self::Memory(_) => Ok(()),
        }
    }

    /// Read and deserialize a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails or the stored value is not
    /// valid JSON for `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        scope: &Scope,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        match self.get(scope, key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize and write a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the write fails.
    pub async fn set_json<T: Serialize + Sync>(
        &self,
        scope: &Scope,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.set(scope, key, &raw).await
    }
}
