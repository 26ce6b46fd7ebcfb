//! Deletion of languages and keys together with the cells that reference them.
//!
//! Cells have no lifecycle of their own, so this is the only place that has to
//! keep the matrix free of dangling references. Each cascade runs in a single
//! transaction: lock the owner (where the backend has row locks), delete its
//! cells, delete the owner, commit.
//! Nothing is visible to other connections until the commit, and any failure
//! before it rolls the whole sequence back.

use tracing::debug;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::CascadeReport;

/// Entity whose deletion drags its cells along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Language,
    Key,
}

impl Owner {
    fn table(&self) -> &'static str {
        match self {
            Owner::Language => "languages",
            Owner::Key => "translation_keys",
        }
    }

    /// Column of `translations` that points at this owner
    fn reference_column(&self) -> &'static str {
        match self {
            Owner::Language => "language_id",
            Owner::Key => "key_id",
        }
    }

    fn describe(&self, id: i64) -> String {
        match self {
            Owner::Language => format!("Language with id {} not found", id),
            Owner::Key => format!("Translation key with id {} not found", id),
        }
    }
}

#[derive(Clone)]
pub struct CascadeCoordinator {
    db: Database,
}

impl CascadeCoordinator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Delete a language and every cell written for it.
    pub async fn delete_language(&self, id: i64) -> StoreResult<CascadeReport> {
        self.cascade(Owner::Language, id).await
    }

    /// Delete a translation key and every cell written for it.
    pub async fn delete_key(&self, id: i64) -> StoreResult<CascadeReport> {
        self.cascade(Owner::Key, id).await
    }

    async fn cascade(&self, owner: Owner, id: i64) -> StoreResult<CascadeReport> {
        let mut tx = self.db.pool().begin().await?;

        // On Postgres the owner is locked first, so concurrent cell writes for
        // it wait on their foreign key check and then fail instead of slipping
        // in between the two deletes. SQLite serializes writers, and the first
        // DELETE below already takes its write lock.
        if let Some(row_lock) = self.db.backend().row_lock() {
            let lock_owner = format!("SELECT id FROM {} WHERE id = $1{}", owner.table(), row_lock);
            let found: Option<i64> = sqlx::query_scalar(&lock_owner)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

            if found.is_none() {
                tx.rollback().await?;
                return Err(StoreError::NotFound(owner.describe(id)));
            }
        }

        let delete_cells = format!(
            "DELETE FROM translations WHERE {} = $1",
            owner.reference_column()
        );
        let cells_removed = sqlx::query(&delete_cells)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let delete_owner = format!("DELETE FROM {} WHERE id = $1", owner.table());
        let owners_removed = sqlx::query(&delete_owner)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if owners_removed != 1 {
            // Missing from the start, or someone else finished the same delete
            // first. Either way the cell deletes above must not stick.
            tx.rollback().await?;
            return Err(StoreError::NotFound(owner.describe(id)));
        }

        tx.commit().await?;

        debug!(
            "Deleted {} {} and {} dependent cells",
            owner.table(),
            id,
            cells_removed
        );

        Ok(CascadeReport {
            owner_id: id,
            cells_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::create_test_db;

    // ==================== Helper Functions ====================

    async fn seed(db: &Database) {
        for (code, name) in [("en", "English"), ("ru", "Русский")] {
            sqlx::query("INSERT INTO languages (code, name) VALUES ($1, $2)")
                .bind(code)
                .bind(name)
                .execute(db.pool())
                .await
                .expect("language");
        }
        for key in ["ui_Play", "ui_Quit"] {
            sqlx::query("INSERT INTO translation_keys (key) VALUES ($1)")
                .bind(key)
                .execute(db.pool())
                .await
                .expect("key");
        }
        for (key_id, language_id) in [(1_i64, 1_i64), (1, 2), (2, 1), (2, 2)] {
            sqlx::query(
                "INSERT INTO translations (key_id, language_id, value) VALUES ($1, $2, 'x')",
            )
            .bind(key_id)
            .bind(language_id)
            .execute(db.pool())
            .await
            .expect("cell");
        }
    }

    async fn count(db: &Database, sql: &str) -> i64 {
        sqlx::query_scalar(sql)
            .fetch_one(db.pool())
            .await
            .expect("count")
    }

    // ==================== Owner Tests ====================

    #[test]
    fn test_owner_columns() {
        assert_eq!(Owner::Language.table(), "languages");
        assert_eq!(Owner::Language.reference_column(), "language_id");
        assert_eq!(Owner::Key.table(), "translation_keys");
        assert_eq!(Owner::Key.reference_column(), "key_id");
    }

    #[test]
    fn test_owner_describe() {
        assert!(Owner::Language.describe(7).contains("Language with id 7"));
        assert!(Owner::Key.describe(9).contains("Translation key with id 9"));
    }

    // ==================== delete_language Tests ====================

    #[tokio::test]
    async fn test_delete_language_removes_its_cells_only() {
        let (db, _temp_dir) = create_test_db().await;
        seed(&db).await;
        let coordinator = CascadeCoordinator::new(db.clone());

        let report = coordinator.delete_language(2).await.expect("Should delete");
        assert_eq!(report.owner_id, 2);
        assert_eq!(report.cells_removed, 2);

        assert_eq!(count(&db, "SELECT COUNT(*) FROM languages").await, 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM translations WHERE language_id = 2").await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM translations WHERE language_id = 1").await, 2);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM translation_keys").await, 2);
    }

    #[tokio::test]
    async fn test_delete_language_without_cells() {
        let (db, _temp_dir) = create_test_db().await;
        sqlx::query("INSERT INTO languages (code, name) VALUES ('tr', 'Türkçe')")
            .execute(db.pool())
            .await
            .expect("language");

        let report = CascadeCoordinator::new(db.clone())
            .delete_language(1)
            .await
            .expect("Should delete");
        assert_eq!(report.cells_removed, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM languages").await, 0);
    }

    #[tokio::test]
    async fn test_delete_missing_language() {
        let (db, _temp_dir) = create_test_db().await;
        seed(&db).await;

        let result = CascadeCoordinator::new(db.clone()).delete_language(99).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(count(&db, "SELECT COUNT(*) FROM translations").await, 4);
    }

    #[tokio::test]
    async fn test_delete_language_twice() {
        let (db, _temp_dir) = create_test_db().await;
        seed(&db).await;
        let coordinator = CascadeCoordinator::new(db.clone());

        coordinator.delete_language(1).await.expect("first delete");
        let second = coordinator.delete_language(1).await;
        assert!(matches!(second, Err(StoreError::NotFound(_))));
    }

    // ==================== delete_key Tests ====================

    #[tokio::test]
    async fn test_delete_key_removes_its_cells_only() {
        let (db, _temp_dir) = create_test_db().await;
        seed(&db).await;

        let report = CascadeCoordinator::new(db.clone())
            .delete_key(1)
            .await
            .expect("Should delete");
        assert_eq!(report.cells_removed, 2);

        assert_eq!(count(&db, "SELECT COUNT(*) FROM translation_keys").await, 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM translations WHERE key_id = 1").await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM translations WHERE key_id = 2").await, 2);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM languages").await, 2);
    }

    #[tokio::test]
    async fn test_delete_missing_key() {
        let (db, _temp_dir) = create_test_db().await;

        let result = CascadeCoordinator::new(db).delete_key(1).await;
        match result {
            Err(StoreError::NotFound(msg)) => assert!(msg.contains("id 1")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    // ==================== Atomicity Tests ====================

    #[tokio::test]
    async fn test_storage_failure_leaves_cells_in_place() {
        let (db, _temp_dir) = create_test_db().await;
        seed(&db).await;

        // An extra reference the cascade does not know about makes the owner
        // delete fail after the cells were already deleted in the transaction.
        sqlx::query(
            "CREATE TABLE pins (language_id INTEGER NOT NULL REFERENCES languages (id))",
        )
        .execute(db.pool())
        .await
        .expect("create pins");
        sqlx::query("INSERT INTO pins (language_id) VALUES (1)")
            .execute(db.pool())
            .await
            .expect("pin");

        let result = CascadeCoordinator::new(db.clone()).delete_language(1).await;
        assert!(matches!(result, Err(StoreError::Storage(_))));

        assert_eq!(count(&db, "SELECT COUNT(*) FROM languages WHERE id = 1").await, 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM translations WHERE language_id = 1").await, 2);
    }
}
