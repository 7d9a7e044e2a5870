//! SQLite connection lifecycle.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, Transaction};
use tracing::debug;

use rootcat_core::{CatalogConfig, Root};
use rootcat_scan::RootSource;

use crate::error::{RegistryError, Result};
use crate::registry;

/// Owned handle to the catalog database.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open the database named by `config`, creating its directory and
    /// tables when missing.
    pub fn init(config: &CatalogConfig) -> Result<Self> {
        let path = config.database_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RegistryError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Self::open(&path)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let db = Database {
            conn,
            path: Some(path.to_path_buf()),
        };
        db.configure_pragmas()?;
        db.initialize_schema()?;
        debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn, path: None };
        db.configure_pragmas()?;
        db.initialize_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction; registry functions accept it through deref.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// File backing this database, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection, reporting any error SQLite raises on close.
    pub fn shutdown(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| RegistryError::Database(err))?;
        debug!("database closed");
        Ok(())
    }
}

impl RootSource for Database {
    type Error = RegistryError;

    fn list_roots(&self) -> Result<Vec<Root>> {
        registry::list(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let enabled: i64 = db
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_init_creates_directory() {
        let temp = TempDir::new().unwrap();
        let config = CatalogConfig {
            database: Some(temp.path().join("nested/dir/catalog.db")),
            ..CatalogConfig::default()
        };

        let db = Database::init(&config).unwrap();
        assert_eq!(db.path(), Some(temp.path().join("nested/dir/catalog.db").as_path()));
        db.shutdown().unwrap();

        assert!(temp.path().join("nested/dir/catalog.db").exists());
    }

    #[test]
    fn test_reopen_keeps_schema() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.db");

        Database::open(&path).unwrap().shutdown().unwrap();
        let db = Database::open(&path).unwrap();
        let tables: i64 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('roots', 'root_files', 'root_folders')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}
