//! The database handle.

use crate::statement::Statement;
use crate::transaction::Transaction;
use embedsql_core::{
    Backend, BackendConnection, ConnectionError, ConnectionErrorKind, DatabaseConfig, Error,
    OpenFlags, Result, TransactionMode,
};
use embedsql_sqlite::SqliteBackend;
use std::time::Duration;

/// An open (or closed) database connection.
///
/// The connection is owned exclusively. Statements and transactions borrow the
/// `Database`, so anything that closes or replaces the connection
/// ([`close`](Self::close), [`set_busy_timeout`](Self::set_busy_timeout))
/// needs `&mut self` and cannot run while one is alive:
///
/// ```compile_fail
/// use embedsql::Database;
///
/// let mut db = Database::open_memory()?;
/// let stmt = db.prepare("SELECT 1")?;
/// db.close()?;
/// drop(stmt);
/// # Ok::<(), embedsql::Error>(())
/// ```
pub struct Database<B: Backend = SqliteBackend> {
    backend: B,
    config: DatabaseConfig,
    conn: Option<B::Connection>,
}

impl<B: Backend> std::fmt::Debug for Database<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl Database<SqliteBackend> {
    /// Open a SQLite database file.
    ///
    /// With empty flags the file is opened read-write and created if missing.
    ///
    /// ```no_run
    /// use embedsql::{Database, OpenFlags};
    ///
    /// let db = Database::open("app.db", OpenFlags::empty())?;
    /// let archive = Database::open("archive.db", OpenFlags::READ_ONLY | OpenFlags::SHARED_CACHE)?;
    /// # Ok::<(), embedsql::Error>(())
    /// ```
    pub fn open(path: impl Into<String>, flags: impl Into<OpenFlags>) -> Result<Self> {
        Self::open_with(SqliteBackend, DatabaseConfig::file(path).flags(flags.into()))
    }

    /// Open a private in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        Self::open_with(SqliteBackend, DatabaseConfig::memory())
    }

    /// Open a SQLite database from a full configuration.
    pub fn open_config(config: DatabaseConfig) -> Result<Self> {
        Self::open_with(SqliteBackend, config)
    }
}

impl<B: Backend> Database<B> {
    /// Open a database through an explicit backend.
    pub fn open_with(backend: B, config: DatabaseConfig) -> Result<Self> {
        let conn = backend.open(&config)?;
        Ok(Self {
            backend,
            config,
            conn: Some(conn),
        })
    }

    pub(crate) fn conn(&self) -> Result<&B::Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| Error::Connection(ConnectionError::closed(&self.config.path)))
    }

    /// Change the busy timeout.
    ///
    /// The timeout is an open-time option, so the connection is closed, the
    /// new timeout is merged into the stored configuration and the connection
    /// is reopened. A closed database is reopened as well. For an in-memory
    /// database the reopen yields a fresh, empty database.
    ///
    /// If the reopen fails the database stays closed and every later
    /// operation fails with [`ConnectionErrorKind::Closed`].
    #[tracing::instrument(level = "debug", skip(self), fields(path = %self.config.path))]
    pub fn set_busy_timeout(&mut self, timeout: Duration) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close() {
                tracing::warn!(error = %e, "Close before reopen failed");
            }
        }

        self.config = std::mem::take(&mut self.config).busy_timeout(timeout);

        match self.backend.open(&self.config) {
            Ok(conn) => {
                self.conn = Some(conn);
                tracing::debug!(
                    busy_timeout_ms = self.config.busy_timeout_ms,
                    "Database reopened"
                );
                Ok(())
            }
            Err(e) => Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Reopen,
                code: e.code(),
                message: e.message().to_string(),
                path: Some(self.config.path.clone()),
            })),
        }
    }

    /// Execute SQL text with no parameters, discarding any rows.
    ///
    /// Multiple `;`-separated statements are run in order.
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.conn()?.execute(sql)
    }

    /// Compile SQL into a reusable statement.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_, B>> {
        let inner = self.conn()?.prepare(sql)?;
        Ok(Statement::new(inner, sql))
    }

    /// Begin a transaction. See [`Transaction`].
    pub fn transaction(&self, mode: TransactionMode) -> Result<Transaction<'_, B>> {
        Transaction::begin(self, mode)
    }

    /// Close the connection. Closing a closed database is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close(),
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn path(&self) -> &str {
        &self.config.path
    }

    /// The configuration the connection was (re)opened with.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Is a transaction open? Always false for a closed database.
    pub fn in_transaction(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| c.in_transaction())
    }

    /// Rowid of the most recent successful INSERT.
    pub fn last_insert_rowid(&self) -> Result<i64> {
        Ok(self.conn()?.last_insert_rowid())
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE.
    pub fn changes(&self) -> Result<u64> {
        Ok(self.conn()?.changes())
    }
}
