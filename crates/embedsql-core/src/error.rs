//! Error types for embedsql operations.
//!
//! Every failure carries the backend's native result code (when the backend
//! produced one) and the backend's message text, unchanged. Callers can match
//! on the `kind` of each error for portable handling, or on `code` for
//! backend-specific handling.

use std::fmt;

/// The primary error type for all embedsql operations.
#[derive(Debug)]
pub enum Error {
    /// Opening, reopening, or using a closed connection
    Connection(ConnectionError),
    /// Statement compilation or execution errors
    Query(QueryError),
    /// Parameter binding errors
    Bind(BindError),
    /// Result column read errors
    Read(ReadError),
    /// Invalid configuration input
    Config(ConfigError),
}

#[derive(Debug, Clone)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    /// Backend-native result code, if the backend produced one.
    pub code: Option<i32>,
    pub message: String,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// The initial open call failed
    Open,
    /// Reopening after a configuration change failed; the database is now closed
    Reopen,
    /// The operation was attempted on a closed database
    Closed,
}

#[derive(Debug, Clone)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub code: Option<i32>,
    pub sql: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Another connection holds a conflicting lock (retry may succeed)
    Busy,
    /// A conflicting lock is held within the same connection or shared cache
    Locked,
    /// Constraint violation (unique, foreign key, not null, check)
    Constraint,
    /// Write attempted on a read-only database
    ReadOnly,
    /// The database file is malformed or not a database
    Corrupt,
    /// Disk I/O failure
    Io,
    /// The disk or database is full
    Full,
    /// Access permission denied
    Permission,
    /// The backend API was used incorrectly
    Misuse,
    /// The operation was interrupted
    Interrupted,
    /// Any other database error, including SQL syntax errors
    Database,
}

#[derive(Debug, Clone)]
pub struct BindError {
    pub kind: BindErrorKind,
    /// 1-based parameter index
    pub index: usize,
    pub code: Option<i32>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindErrorKind {
    /// The payload is longer than the backend can represent
    Range,
    /// The value has no representation in the backend's type system
    Mismatch,
    /// The backend rejected the bind (bad index, misuse, ...)
    Backend,
}

#[derive(Debug, Clone)]
pub struct ReadError {
    pub kind: ReadErrorKind,
    /// 0-based column index
    pub index: Option<usize>,
    pub code: Option<i32>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorKind {
    /// No current row: the statement was not run, or it is exhausted
    NoRow,
    /// The column index is out of range
    Column,
    /// The stored value cannot be converted to the requested type
    Type,
    /// The backend reported an error while reading
    Backend,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConnectionError {
    /// Error for an operation attempted on a closed database.
    pub fn closed(path: &str) -> Self {
        Self {
            kind: ConnectionErrorKind::Closed,
            code: None,
            message: "database is closed".to_string(),
            path: Some(path.to_string()),
        }
    }
}

impl BindError {
    /// Was the payload too large for the backend?
    pub fn is_range(&self) -> bool {
        self.kind == BindErrorKind::Range
    }
}

impl ReadError {
    /// Error for reading without a current row.
    pub fn no_row(index: usize) -> Self {
        Self {
            kind: ReadErrorKind::NoRow,
            index: Some(index),
            code: None,
            message: "no row available; call run() first".to_string(),
        }
    }

    /// Error for a value that cannot be converted to `expected`.
    pub fn type_mismatch(expected: &'static str, actual: impl fmt::Display) -> Self {
        Self {
            kind: ReadErrorKind::Type,
            index: None,
            code: None,
            message: format!("expected {expected}, found {actual}"),
        }
    }

    /// Attach the column index this error refers to.
    #[must_use]
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl Error {
    /// Backend-native result code, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Connection(e) => e.code,
            Error::Query(e) => e.code,
            Error::Bind(e) => e.code,
            Error::Read(e) => e.code,
            Error::Config(_) => None,
        }
    }

    /// The message text, as reported by the backend where applicable.
    pub fn message(&self) -> &str {
        match self {
            Error::Connection(e) => &e.message,
            Error::Query(e) => &e.message,
            Error::Bind(e) => &e.message,
            Error::Read(e) => &e.message,
            Error::Config(e) => &e.message,
        }
    }

    /// Is this a lock conflict that may succeed when retried?
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Query(QueryError {
                kind: QueryErrorKind::Busy | QueryErrorKind::Locked,
                ..
            })
        )
    }

    /// Did this fail because the database is closed?
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Closed,
                ..
            })
        )
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

fn write_code(f: &mut fmt::Formatter<'_>, code: Option<i32>) -> fmt::Result {
    match code {
        Some(code) => write!(f, " (code {code})"),
        None => Ok(()),
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {e}"),
            Error::Query(e) => write!(f, "Query error: {e}"),
            Error::Bind(e) => write!(f, "Bind error: {e}"),
            Error::Read(e) => write!(f, "Read error: {e}"),
            Error::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path, self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        write_code(f, self.code)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        write_code(f, self.code)
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parameter {}: {}", self.index, self.message)?;
        write_code(f, self.code)
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "column {}: {}", index, self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        write_code(f, self.code)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<BindError> for Error {
    fn from(err: BindError) -> Self {
        Error::Bind(err)
    }
}

impl From<ReadError> for Error {
    fn from(err: ReadError) -> Self {
        Error::Read(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for embedsql operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_and_locked_are_retryable() {
        let busy = Error::Query(QueryError {
            kind: QueryErrorKind::Busy,
            code: Some(5),
            sql: Some("INSERT INTO t VALUES (1)".to_string()),
            message: "database is locked".to_string(),
        });
        assert!(busy.is_retryable());
        assert_eq!(busy.code(), Some(5));
        assert_eq!(busy.message(), "database is locked");
        assert_eq!(busy.sql(), Some("INSERT INTO t VALUES (1)"));

        let corrupt = Error::Query(QueryError {
            kind: QueryErrorKind::Corrupt,
            code: Some(26),
            sql: None,
            message: "file is not a database".to_string(),
        });
        assert!(!corrupt.is_retryable());
    }

    #[test]
    fn closed_connection_flag() {
        let err = Error::from(ConnectionError::closed("cache.db"));
        assert!(err.is_closed());
        assert_eq!(err.code(), None);
        assert_eq!(
            err.to_string(),
            "Connection error: cache.db: database is closed"
        );
    }

    #[test]
    fn display_includes_native_code() {
        let err = Error::Bind(BindError {
            kind: BindErrorKind::Backend,
            index: 3,
            code: Some(25),
            message: "column index out of range".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Bind error: parameter 3: column index out of range (code 25)"
        );
    }

    #[test]
    fn read_error_helpers() {
        let err = ReadError::type_mismatch("i64", "NULL").at(2);
        assert_eq!(err.kind, ReadErrorKind::Type);
        assert_eq!(err.index, Some(2));
        assert_eq!(err.to_string(), "column 2: expected i64, found NULL");

        assert_eq!(ReadError::no_row(0).kind, ReadErrorKind::NoRow);
    }

    #[test]
    fn range_is_distinct_from_backend_rejection() {
        let range = BindError {
            kind: BindErrorKind::Range,
            index: 1,
            code: None,
            message: "value too long".to_string(),
        };
        let rejected = BindError {
            kind: BindErrorKind::Backend,
            ..range.clone()
        };
        assert!(range.is_range());
        assert!(!rejected.is_range());
    }
}
