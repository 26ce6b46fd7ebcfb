//! The set of translation keys (`ui_Play`, `ui_Settings`, ...).

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::cascade::CascadeCoordinator;
use crate::db::Database;
use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::models::{CascadeReport, KeyRow, TranslationKey};

static KEY_REGEX: OnceLock<Regex> = OnceLock::new();

/// Trim a candidate key and check it against `^ui_[A-Za-z]+$`.
pub fn validate_key(key: &str) -> StoreResult<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(StoreError::Validation("Key is required".to_string()));
    }

    let regex = KEY_REGEX.get_or_init(|| Regex::new(r"^ui_[A-Za-z]+$").unwrap());
    if !regex.is_match(key) {
        return Err(StoreError::Validation(format!(
            "Key '{}' must start with 'ui_' followed by letters only (e.g., 'ui_Play')",
            key
        )));
    }
    Ok(key)
}

#[derive(Clone)]
pub struct TranslationKeyStore {
    db: Database,
    cascade: CascadeCoordinator,
}

impl TranslationKeyStore {
    pub fn new(db: Database) -> Self {
        let cascade = CascadeCoordinator::new(db.clone());
        Self { db, cascade }
    }

    /// Create a key. A fresh key has no cells yet.
    pub async fn add(&self, key: &str) -> StoreResult<KeyRow> {
        let key = validate_key(key)?;

        let inserted = sqlx::query_as::<_, TranslationKey>(
            "INSERT INTO translation_keys (key) VALUES ($1)
             ON CONFLICT (key) DO NOTHING
             RETURNING id, key",
        )
        .bind(key)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict(key)
            } else {
                StoreError::Storage(e)
            }
        })?;

        let created = inserted.ok_or_else(|| conflict(key))?;
        debug!("Added translation key {} ({})", created.key, created.id);
        Ok(created.into())
    }

    /// Look a key up by its exact text.
    pub async fn find(&self, key: &str) -> StoreResult<Option<TranslationKey>> {
        let found = sqlx::query_as::<_, TranslationKey>(
            "SELECT id, key FROM translation_keys WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(found)
    }

    /// Delete a key along with all of its cells.
    pub async fn remove(&self, id: i64) -> StoreResult<CascadeReport> {
        self.cascade.delete_key(id).await
    }

    /// Keys in creation order, skipping `offset` and returning at most `limit`.
    pub(crate) async fn window(&self, offset: i64, limit: i64) -> StoreResult<Vec<TranslationKey>> {
        let keys = sqlx::query_as::<_, TranslationKey>(
            "SELECT id, key FROM translation_keys ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        Ok(keys)
    }

    pub(crate) async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM translation_keys")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count)
    }

    pub(crate) async fn exists(&self, id: i64) -> StoreResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM translation_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(found.is_some())
    }
}

fn conflict(key: &str) -> StoreError {
    StoreError::Conflict(format!("Key '{}' already exists", key))
}
