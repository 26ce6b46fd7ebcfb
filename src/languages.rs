//! Registered languages and the fixed table of languages the editor knows how
//! to name.

use tracing::debug;

use crate::cascade::CascadeCoordinator;
use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::{AvailableLanguage, CascadeReport, Language};

/// Languages offered for registration, in display order.
///
/// Codes outside this table can still be registered with an explicit name;
/// they just never show up as available.
pub const KNOWN_LANGUAGES: &[AvailableLanguage] = &[
    AvailableLanguage {
        code: "en",
        name: "English",
    },
    AvailableLanguage {
        code: "ru",
        name: "Русский",
    },
    AvailableLanguage {
        code: "tr",
        name: "Türkçe",
    },
];

/// Look up a known language by code.
pub fn known_language(code: &str) -> Option<&'static AvailableLanguage> {
    KNOWN_LANGUAGES.iter().find(|lang| lang.code == code)
}

/// A language code is exactly two characters and not blank.
pub fn validate_code(code: &str) -> StoreResult<()> {
    if code.trim().is_empty() || code.chars().count() != 2 {
        return Err(StoreError::Validation(
            "Language code must be 2 characters (e.g., 'en', 'fr')".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct LanguageCatalog {
    db: Database,
    cascade: CascadeCoordinator,
}

impl LanguageCatalog {
    pub fn new(db: Database) -> Self {
        let cascade = CascadeCoordinator::new(db.clone());
        Self { db, cascade }
    }

    /// All registered languages, oldest first.
    pub async fn list_registered(&self) -> StoreResult<Vec<Language>> {
        let languages = sqlx::query_as::<_, Language>(
            "SELECT id, code, name FROM languages ORDER BY id",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(languages)
    }

    /// Known languages that are not registered yet.
    pub async fn list_available(&self) -> StoreResult<Vec<AvailableLanguage>> {
        let registered: Vec<String> = sqlx::query_scalar("SELECT code FROM languages")
            .fetch_all(self.db.pool())
            .await?;

        Ok(KNOWN_LANGUAGES
            .iter()
            .filter(|lang| !registered.iter().any(|code| code == lang.code))
            .copied()
            .collect())
    }

    /// Register a language.
    ///
    /// A blank `name` falls back to the known-language table. The duplicate
    /// check and the insert are one statement, so two concurrent registrations
    /// of the same code cannot both succeed.
    pub async fn register(&self, code: &str, name: &str) -> StoreResult<Language> {
        validate_code(code)?;

        let name = match name.trim() {
            "" => known_language(code)
                .map(|lang| lang.name)
                .ok_or_else(|| {
                    StoreError::Validation(format!("A name is required for language '{}'", code))
                })?,
            trimmed => trimmed,
        };

        let inserted = sqlx::query_as::<_, Language>(
            "INSERT INTO languages (code, name) VALUES ($1, $2)
             ON CONFLICT (code) DO NOTHING
             RETURNING id, code, name",
        )
        .bind(code)
        .bind(name)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                conflict(code)
            } else {
                StoreError::Storage(e)
            }
        })?;

        let language = inserted.ok_or_else(|| conflict(code))?;
        debug!("Registered language {} ({})", language.code, language.id);
        Ok(language)
    }

    /// Delete a language along with all of its cells.
    pub async fn unregister(&self, id: i64) -> StoreResult<CascadeReport> {
        self.cascade.delete_language(id).await
    }
}

fn conflict(code: &str) -> StoreError {
    StoreError::Conflict(format!("Language '{}' already exists", code))
}
