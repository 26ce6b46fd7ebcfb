//! The sparse (key, language) → value table.
//!
//! Reads come back one page of keys at a time, each key carrying only the
//! cells that were actually written. Writes go through [`TranslationMatrix::upsert`],
//! the only way a cell is ever created or changed.

use std::collections::HashMap;
use tracing::debug;

use crate::db::Database;
use crate::error::{is_foreign_key_violation, StoreError, StoreResult};
use crate::keys::TranslationKeyStore;
use crate::languages::LanguageCatalog;
use crate::models::{Cell, CellEntry, KeyRow, TablePage};

#[derive(Clone)]
pub struct TranslationMatrix {
    db: Database,
    keys: TranslationKeyStore,
    languages: LanguageCatalog,
}

impl TranslationMatrix {
    pub fn new(db: Database) -> Self {
        Self {
            keys: TranslationKeyStore::new(db.clone()),
            languages: LanguageCatalog::new(db.clone()),
            db,
        }
    }

    /// One window of keys (1-based `page_number`) with their cells, plus the
    /// full language list and the total key count.
    pub async fn page(&self, page_number: u32, page_size: u32) -> StoreResult<TablePage> {
        if page_number == 0 || page_size == 0 {
            return Err(StoreError::Validation(
                "Page number and page size must be at least 1".to_string(),
            ));
        }
        let offset = i64::from(page_number - 1)
            .checked_mul(i64::from(page_size))
            .ok_or_else(|| StoreError::Validation("Page is out of range".to_string()))?;

        let keys = self.keys.window(offset, i64::from(page_size)).await?;

        let mut cells_by_key: HashMap<i64, Vec<CellEntry>> = HashMap::new();
        if let (Some(first), Some(last)) = (keys.first(), keys.last()) {
            let cells = sqlx::query_as::<_, CellEntry>(
                "SELECT t.id, t.key_id, t.language_id,
                        l.code AS language_code, l.name AS language_name, t.value
                 FROM translations t
                 JOIN languages l ON l.id = t.language_id
                 WHERE t.key_id BETWEEN $1 AND $2
                 ORDER BY t.key_id, t.language_id",
            )
            .bind(first.id)
            .bind(last.id)
            .fetch_all(self.db.pool())
            .await?;

            for cell in cells {
                cells_by_key.entry(cell.key_id).or_default().push(cell);
            }
        }

        // Keys created inside the id range after the window was read are
        // not in `keys`, so their cells are simply never picked up.
        let rows = keys
            .into_iter()
            .map(|key| KeyRow {
                cells: cells_by_key.remove(&key.id).unwrap_or_default(),
                id: key.id,
                key: key.key,
            })
            .collect();

        let languages = self.languages.list_registered().await?;
        let total_count = self.keys.count().await?;

        Ok(TablePage {
            keys: rows,
            languages,
            total_count,
            current_page: page_number,
            page_size,
        })
    }

    /// Write `value` into the (key, language) cell, creating it on first write.
    ///
    /// The insert only happens when both ids exist, and the unique
    /// (key_id, language_id) constraint turns a second write into an update,
    /// so concurrent editors never produce duplicate cells.
    pub async fn upsert(&self, key_id: i64, language_id: i64, value: &str) -> StoreResult<Cell> {
        let written = sqlx::query_as::<_, Cell>(
            "INSERT INTO translations (key_id, language_id, value)
             SELECT $1, $2, $3
             WHERE EXISTS (SELECT 1 FROM translation_keys WHERE id = $1)
               AND EXISTS (SELECT 1 FROM languages WHERE id = $2)
             ON CONFLICT (key_id, language_id) DO UPDATE SET value = excluded.value
             RETURNING id, key_id, language_id, value",
        )
        .bind(key_id)
        .bind(language_id)
        .bind(value)
        .fetch_optional(self.db.pool())
        .await;

        match written {
            Ok(Some(cell)) => {
                debug!("Wrote cell {} (key {}, language {})", cell.id, key_id, language_id);
                Ok(cell)
            }
            Ok(None) => Err(self.missing_reference(key_id, language_id).await),
            // A cascade delete of the key or language committed under us.
            Err(e) if is_foreign_key_violation(&e) => {
                Err(self.missing_reference(key_id, language_id).await)
            }
            Err(e) => Err(StoreError::Storage(e)),
        }
    }

    /// Work out which side of a rejected write is missing.
    async fn missing_reference(&self, key_id: i64, language_id: i64) -> StoreError {
        match self.keys.exists(key_id).await {
            Ok(false) => {
                StoreError::NotFound(format!("Translation key with id {} not found", key_id))
            }
            Ok(true) => {
                StoreError::NotFound(format!("Language with id {} not found", language_id))
            }
            Err(e) => e,
        }
    }
}
