#![deny(warnings)]

//! Persistence layer: key-value stores and the game settings accessor.
//!
//! Game settings live as one JSON blob under [`SETTINGS_KEY`]. The store is
//! last-write-wins; nothing here is transactional.

pub mod settings;
pub mod sqlite;
pub mod store;

pub use settings::{SettingsAccessor, SETTINGS_KEY};
pub use sqlite::{database_path, ensure_save_dir, init_db, SqliteStore};
pub use store::{KeyValueStore, MemoryStore, StoreError};

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/main.db"
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn url_is_sqlite() {
        assert!(default_sqlite_url().starts_with("sqlite://"));
    }
}
