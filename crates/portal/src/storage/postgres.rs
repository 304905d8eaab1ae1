//! `PostgreSQL` blob store.
//!
//! Table `portal.blob` is created by the migrations in
//! `crates/portal/migrations/`, run with `bv-cli migrate`.

use sqlx::{PgPool, Row};

use super::StorageError;

/// Blob store backed by the `portal.blob` table.
#[derive(Clone)]
pub struct PgBlobStore {
    pool: PgPool,
}

impl PgBlobStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(super) async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM portal.blob WHERE namespace = $1 AND key = $2")
            .bind(namespace)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.try_get::<String, _>("value")).transpose()?)
    }

    pub(super) async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO portal.blob (namespace, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (namespace, key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            ",
        )
        .bind(namespace)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub(super) async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM portal.blob WHERE namespace = $1 AND key = $2")
            .bind(namespace)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn list(&self, namespace: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT key FROM portal.blob
            WHERE namespace = $1 AND key LIKE $2 ESCAPE '\'
            ORDER BY key
            ",
        )
        .bind(namespace)
        .bind(format!("{}%", escape_like(prefix)))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| r.try_get::<String, _>("key").map_err(StorageError::from))
            .collect()
    }

    pub(super) async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

/// Escape `LIKE` wildcards so a prefix matches literally.
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("notes-"), "notes-");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
