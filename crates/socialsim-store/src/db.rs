use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, Transaction};

use socialsim_types::{Error, Result};

use crate::schema;

/// SQLite database handle implementing every repository port.
///
/// The connection sits behind a `Mutex` so the store is safe for
/// concurrent callers (multiple runs may share one database). Turns within
/// a run are sequential, so contention is limited to cross-run traffic.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(|e| {
            Error::storage(format!(
                "failed to open database {}: {}",
                db_path.display(),
                e
            ))
        })?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::storage)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")
            .map_err(Error::storage)?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a read or self-committing write against the connection
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| Error::storage("database connection lock poisoned"))?;
        f(&guard)
    }

    /// Scoped write transaction: commits when the closure returns Ok,
    /// rolls back when it returns Err or unwinds.
    ///
    /// Repositories called with the transaction handle must not commit on
    /// their own; they only see `&Connection`.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| Error::storage("database connection lock poisoned"))?;
        let tx = guard.transaction().map_err(Error::storage)?;
        let value = f(&tx)?;
        tx.commit().map_err(Error::storage)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialsim_types::{Post, PostSource};

    #[test]
    fn transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let post = Post::new(PostSource::Bluesky, "p1", "@author", "2024-01-01T00:00:00Z");

        let result: Result<()> = db.with_transaction(|tx| {
            crate::posts::insert_post(tx, &post)?;
            Err(Error::InvalidInput("boom".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM feed_posts", [], |row| row.get(0))
                    .map_err(Error::storage)
            })
            .unwrap();
        assert_eq!(count, 0, "rolled-back insert must not be visible");
    }

    #[test]
    fn transaction_commits_on_success() {
        let db = Database::open_in_memory().unwrap();
        let post = Post::new(PostSource::Bluesky, "p1", "@author", "2024-01-01T00:00:00Z");

        db.with_transaction(|tx| crate::posts::insert_post(tx, &post))
            .unwrap();

        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM feed_posts", [], |row| row.get(0))
                    .map_err(Error::storage)
            })
            .unwrap();
        assert_eq!(count, 1);
    }
}
