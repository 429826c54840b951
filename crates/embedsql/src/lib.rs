//! embedsql - a synchronous facade over an embedded SQL engine.
//!
//! The facade owns one connection, compiles statements against it, binds and
//! reads typed values with explicit NULL handling, and scopes transactions so
//! that an abandoned transaction is always rolled back.
//!
//! - [`Database`] owns the connection and its [`DatabaseConfig`]
//! - [`Statement`] is a compiled statement borrowing its `Database`
//! - [`Transaction`] is a BEGIN..COMMIT/ROLLBACK guard
//!
//! SQLite (bundled, through `embedsql-sqlite`) is the default backend; any
//! [`Backend`] implementation can be plugged in with [`Database::open_with`].
//!
//! # Quick Start
//!
//! ```
//! use embedsql::prelude::*;
//!
//! let db = Database::open_memory()?;
//! db.execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT, pinned INTEGER)")?;
//!
//! let mut insert = db.prepare("INSERT INTO notes (body, pinned) VALUES (?, ?)")?;
//! insert.bind(1, "buy milk")?;
//! insert.bind(2, None::<bool>)?;
//! insert.run()?;
//! let id = insert.last_insert_rowid();
//!
//! let mut select = db.prepare("SELECT body, pinned FROM notes WHERE id = ?")?;
//! select.bind(1, id)?;
//! assert!(select.run()?);
//! assert_eq!(select.get::<String>(0)?, "buy milk");
//! assert_eq!(select.get::<Option<bool>>(1)?, None);
//! assert!(!select.run()?);
//! # Ok::<(), embedsql::Error>(())
//! ```
//!
//! # Transactions
//!
//! ```
//! use embedsql::prelude::*;
//!
//! let db = Database::open_memory()?;
//! db.execute("CREATE TABLE t (x INTEGER)")?;
//!
//! {
//!     let _tx = db.transaction(TransactionMode::Immediate)?;
//!     db.execute("INSERT INTO t VALUES (1)")?;
//!     // dropped without commit: rolled back
//! }
//!
//! let tx = db.transaction(TransactionMode::Deferred)?;
//! tx.execute("INSERT INTO t VALUES (2)")?;
//! tx.commit()?;
//!
//! let mut count = db.prepare("SELECT count(*) FROM t")?;
//! count.run()?;
//! assert_eq!(count.get::<i64>(0)?, 1);
//! # Ok::<(), embedsql::Error>(())
//! ```

pub mod database;
pub mod statement;
pub mod transaction;

pub use database::Database;
pub use statement::Statement;
pub use transaction::Transaction;

pub use embedsql_core::{
    Backend, BackendConnection, BackendStatement, BindError, BindErrorKind, ConfigError,
    ConnectionError, ConnectionErrorKind, DatabaseConfig, Error, FromValue, MEMORY_PATH,
    OpenFlags, QueryError, QueryErrorKind, ReadError, ReadErrorKind, Result, TransactionMode,
    Value,
};
pub use embedsql_sqlite::{SqliteBackend, sqlite_version, sqlite_version_number};

/// Prelude module for convenient imports.
///
/// ```
/// use embedsql::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Database, DatabaseConfig, Error, FromValue, OpenFlags, Result, Statement, Transaction,
        TransactionMode, Value,
    };
}
