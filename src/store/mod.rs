//! Local lexicon persistence.
//!
//! - [`sqlite`] - SQLite-backed lexicon store with transactional mutations
//! - [`lock`] - advisory exclusive lock over the primary repository

pub mod lock;
pub mod sqlite;

pub use lock::RepoLock;
pub use sqlite::SqliteLexicon;
