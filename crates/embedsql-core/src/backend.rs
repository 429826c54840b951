//! Pluggable backend traits.
//!
//! This module defines the seam between the facade and an embedded SQL engine:
//!
//! - [`Backend`] - Opens connections from a [`DatabaseConfig`]
//! - [`BackendConnection`] - A live connection: executes SQL and compiles statements
//! - [`BackendStatement`] - A compiled statement: binds, steps and reads columns
//! - [`TransactionMode`] - The BEGIN variant used to start a transaction
//!
//! Backends report failures with the error taxonomy from [`crate::error`],
//! passing their native result codes and messages through unchanged. Every
//! call is synchronous; a backend may block internally up to the configured
//! busy timeout, but never suspends.

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::value::Value;

/// How a transaction acquires its locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    /// Locks are acquired lazily on first read or write.
    #[default]
    Deferred,
    /// A write lock is acquired immediately.
    Immediate,
    /// An exclusive lock is acquired immediately.
    Exclusive,
}

impl TransactionMode {
    /// Get the SQL that starts a transaction in this mode.
    #[must_use]
    pub const fn begin_sql(&self) -> &'static str {
        match self {
            TransactionMode::Deferred => "BEGIN DEFERRED TRANSACTION",
            TransactionMode::Immediate => "BEGIN IMMEDIATE TRANSACTION",
            TransactionMode::Exclusive => "BEGIN EXCLUSIVE TRANSACTION",
        }
    }
}

/// SQL that commits the open transaction.
pub const COMMIT_SQL: &str = "COMMIT TRANSACTION";

/// SQL that rolls back the open transaction.
pub const ROLLBACK_SQL: &str = "ROLLBACK TRANSACTION";

/// An embedded SQL engine that can open connections.
pub trait Backend {
    /// The connection type this backend produces.
    type Connection: BackendConnection;

    /// Short backend name for logging.
    fn name(&self) -> &'static str;

    /// Open a connection.
    ///
    /// Failures are reported as [`crate::Error::Connection`] with kind
    /// [`crate::error::ConnectionErrorKind::Open`].
    fn open(&self, config: &DatabaseConfig) -> Result<Self::Connection>;
}

/// A live connection to a database.
pub trait BackendConnection {
    /// The compiled statement type for this connection.
    type Statement: BackendStatement;

    /// Execute SQL text with no parameters, discarding any result rows.
    fn execute(&self, sql: &str) -> Result<()>;

    /// Compile SQL text into a statement.
    fn prepare(&self, sql: &str) -> Result<Self::Statement>;

    /// Rowid of the most recent successful INSERT on this connection.
    fn last_insert_rowid(&self) -> i64;

    /// Rows changed by the most recent INSERT, UPDATE or DELETE.
    fn changes(&self) -> u64;

    /// Is a transaction open on this connection?
    fn in_transaction(&self) -> bool;

    /// Close the connection, reporting any failure from the backend.
    fn close(self) -> Result<()>;
}

/// A compiled statement.
///
/// Parameter indexes are 1-based; column indexes are 0-based.
pub trait BackendStatement {
    /// Number of parameter slots.
    fn parameter_count(&self) -> usize;

    /// 1-based index of a named parameter, including its prefix (`:name`).
    fn parameter_index(&self, name: &str) -> Option<usize>;

    /// Number of result columns.
    fn column_count(&self) -> usize;

    /// Name of a result column.
    fn column_name(&self, index: usize) -> Option<String>;

    /// Largest text or blob payload, in bytes, this statement accepts.
    fn max_length(&self) -> usize;

    /// Bind a value to a parameter slot.
    fn bind(&mut self, index: usize, value: &Value) -> Result<()>;

    /// Bind UTF-8 text without building a [`Value`].
    fn bind_text(&mut self, index: usize, text: &str) -> Result<()>;

    /// Bind a blob without building a [`Value`].
    fn bind_blob(&mut self, index: usize, bytes: &[u8]) -> Result<()>;

    /// Advance to the next result row. Returns false when the statement is done.
    fn step(&mut self) -> Result<bool>;

    /// Read a column of the current row.
    ///
    /// Callers must only invoke this after `step` returned true.
    fn column(&self, index: usize) -> Result<Value>;

    /// Rewind so the statement can run again. Bindings are kept.
    fn reset(&mut self) -> Result<()>;

    /// Set every parameter back to NULL.
    fn clear_bindings(&mut self) -> Result<()>;

    /// Rowid of the most recent successful INSERT on the owning connection.
    fn last_insert_rowid(&self) -> i64;

    /// Rows changed by the most recent statement on the owning connection.
    fn changes(&self) -> u64;
}
