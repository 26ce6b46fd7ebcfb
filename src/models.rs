//! Rows of the three tables and the shapes assembled from them.

use serde::Serialize;

/// A registered language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub id: i64,
    /// Two-character code, unique across the catalog
    pub code: String,
    pub name: String,
}

/// A translation key such as `ui_Play`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TranslationKey {
    pub id: i64,
    pub key: String,
}

/// A single translated value for one (key, language) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub id: i64,
    #[serde(rename = "translationKeyId")]
    pub key_id: i64,
    pub language_id: i64,
    pub value: String,
}

/// A cell joined with the code and name of its language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CellEntry {
    pub id: i64,
    #[serde(rename = "translationKeyId")]
    pub key_id: i64,
    pub language_id: i64,
    pub language_code: String,
    pub language_name: String,
    pub value: String,
}

/// A key with every cell that exists for it. Languages without a cell are
/// absent from `cells`, never present as empty entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRow {
    pub id: i64,
    pub key: String,
    #[serde(rename = "translations")]
    pub cells: Vec<CellEntry>,
}

impl KeyRow {
    /// The cell for a language, if one was ever written.
    pub fn cell(&self, language_id: i64) -> Option<&CellEntry> {
        self.cells.iter().find(|c| c.language_id == language_id)
    }
}

impl From<TranslationKey> for KeyRow {
    fn from(key: TranslationKey) -> Self {
        KeyRow {
            id: key.id,
            key: key.key,
            cells: Vec::new(),
        }
    }
}

/// One window of the translation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePage {
    pub keys: Vec<KeyRow>,
    /// Every registered language, so callers can lay out a dense grid
    pub languages: Vec<Language>,
    /// Number of keys in the whole table, not just this window
    pub total_count: i64,
    pub current_page: u32,
    pub page_size: u32,
}

/// A language the catalog knows how to name but that is not registered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailableLanguage {
    pub code: &'static str,
    pub name: &'static str,
}

/// What a cascade delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub owner_id: i64,
    pub cells_removed: u64,
}
