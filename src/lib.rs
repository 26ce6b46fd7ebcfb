//! Storage and consistency layer for a game's localization table.
//!
//! Three tables (languages, translation keys, translated cells) and the
//! operations that keep them consistent while many editors work at once:
//!
//! - [`LanguageCatalog`]: registered languages and the known-language table
//! - [`TranslationKeyStore`]: the set of `ui_*` keys
//! - [`TranslationMatrix`]: paged reads and the single upsert write path
//! - [`CascadeCoordinator`]: transactional deletes that take cells along
//!
//! Every component is built from a cloned [`Database`] handle. The [`api`]
//! module is the HTTP surface; nothing else in the crate knows about HTTP.

pub mod api;
pub mod cascade;
pub mod config;
pub mod db;
pub mod error;
pub mod keys;
pub mod languages;
pub mod matrix;
pub mod models;
pub mod retry;

pub use cascade::CascadeCoordinator;
pub use db::{Backend, Database};
pub use error::{StoreError, StoreResult};
pub use keys::TranslationKeyStore;
pub use languages::{LanguageCatalog, KNOWN_LANGUAGES};
pub use matrix::TranslationMatrix;
pub use models::{
    AvailableLanguage, CascadeReport, Cell, CellEntry, KeyRow, Language, TablePage, TranslationKey,
};
